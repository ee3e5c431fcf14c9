// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::category::Category;
use crate::domain::models::sub_category::{SubCategory, SubCategoryDetails};
use async_trait::async_trait;
use sea_orm::DbErr;
use thiserror::Error;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
    /// 违反唯一约束
    #[error("Unique constraint violated: {0}")]
    Conflict(String),
    /// 违反外键约束
    #[error("Foreign key constraint violated: {0}")]
    InvalidReference(String),
}

/// 分类仓库特质
///
/// 提供分类与子分类的只读查询，以及开启工作单元（事务）的入口。
/// 所有写操作都必须在 [`TaxonomyUnitOfWork`] 中完成，保证
/// "先检查重名、再写入" 这一序列的原子性。
#[async_trait]
pub trait TaxonomyRepository: Send + Sync {
    /// 根据ID查找分类
    async fn find_category_by_id(&self, id: i32) -> Result<Option<Category>, RepositoryError>;

    /// 列出全部分类，按ID升序
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError>;

    /// 列出全部子分类及其所属分类
    ///
    /// 按分类名称、子分类名称、子分类ID排序
    async fn list_sub_categories(&self) -> Result<Vec<SubCategoryDetails>, RepositoryError>;

    /// 列出去重后的子分类名称，按字母升序
    async fn list_sub_category_names(&self) -> Result<Vec<String>, RepositoryError>;

    /// 查找某个分类下的全部子分类，按名称排序
    ///
    /// 分类不存在时返回空列表
    async fn find_sub_categories_by_category(
        &self,
        category_id: i32,
    ) -> Result<Vec<SubCategory>, RepositoryError>;

    /// 根据ID查找子分类及其所属分类
    async fn find_sub_category_details(
        &self,
        id: i32,
    ) -> Result<Option<SubCategoryDetails>, RepositoryError>;

    /// 开启一个工作单元
    ///
    /// 工作单元未提交即被丢弃时，其中的写入全部回滚
    async fn begin(&self) -> Result<Box<dyn TaxonomyUnitOfWork>, RepositoryError>;
}

/// 分类工作单元特质
///
/// 一个工作单元对应一个存储事务。
#[async_trait]
pub trait TaxonomyUnitOfWork: Send + Sync {
    /// 在事务内根据ID查找分类
    async fn find_category_by_id(&self, id: i32) -> Result<Option<Category>, RepositoryError>;

    /// 在事务内根据ID查找子分类
    async fn find_sub_category_by_id(&self, id: i32)
        -> Result<Option<SubCategory>, RepositoryError>;

    /// 查找同一分类下名称完全相同的子分类
    ///
    /// # 参数
    ///
    /// * `name` - 子分类名称（区分大小写）
    /// * `category_id` - 分类ID
    /// * `exclude_id` - 需要排除的子分类ID（更新时排除自身）
    async fn find_sub_categories_by_name_and_category(
        &self,
        name: &str,
        category_id: i32,
        exclude_id: Option<i32>,
    ) -> Result<Vec<SubCategory>, RepositoryError>;

    /// 统计某个分类下的子分类数量
    async fn count_sub_categories_for_category(
        &self,
        category_id: i32,
    ) -> Result<u64, RepositoryError>;

    /// 插入分类，返回带有存储层分配ID的记录
    async fn insert_category(&self, name: &str) -> Result<Category, RepositoryError>;

    /// 更新分类名称
    ///
    /// * `Err(RepositoryError::NotFound)` - 分类不存在
    async fn update_category(&self, category: &Category) -> Result<Category, RepositoryError>;

    /// 删除分类，返回是否删除了记录
    async fn delete_category_by_id(&self, id: i32) -> Result<bool, RepositoryError>;

    /// 删除某个分类下的全部子分类，返回删除的行数
    async fn delete_sub_categories_by_category(
        &self,
        category_id: i32,
    ) -> Result<u64, RepositoryError>;

    /// 插入子分类，返回带有存储层分配ID的记录
    ///
    /// * `Err(RepositoryError::Conflict)` - 违反 (category_id, name) 唯一索引
    async fn insert_sub_category(
        &self,
        name: &str,
        category_id: i32,
    ) -> Result<SubCategory, RepositoryError>;

    /// 更新子分类名称
    async fn update_sub_category(
        &self,
        sub_category: &SubCategory,
    ) -> Result<SubCategory, RepositoryError>;

    /// 删除子分类，返回是否删除了记录
    async fn delete_sub_category_by_id(&self, id: i32) -> Result<bool, RepositoryError>;

    /// 提交工作单元
    async fn commit(&mut self) -> Result<(), RepositoryError>;
}
