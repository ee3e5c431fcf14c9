// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::category::{Category, CategoryDeletePolicy, CategoryDraft};
use crate::domain::models::sub_category::{SubCategory, SubCategoryDetails, SubCategoryDraft};
use crate::domain::repositories::taxonomy_repository::{RepositoryError, TaxonomyRepository};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use validator::Validate;

/// 分类实体种类，用于错误信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxonomyEntity {
    Category,
    SubCategory,
}

impl fmt::Display for TaxonomyEntity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TaxonomyEntity::Category => write!(f, "Category"),
            TaxonomyEntity::SubCategory => write!(f, "Sub Category"),
        }
    }
}

/// 分类服务错误类型
#[derive(Error, Debug)]
pub enum TaxonomyError {
    /// 同一分类下已存在同名子分类
    #[error("Sub Category exists under {category_name} category. Please use another name.")]
    DuplicateName { category_name: String },
    /// 记录不存在
    #[error("{entity} {id} not found")]
    NotFound { entity: TaxonomyEntity, id: i32 },
    /// 引用的分类不存在
    #[error("Category {category_id} does not exist")]
    InvalidReference { category_id: i32 },
    /// 名称不合法
    #[error("Invalid name: {0}")]
    InvalidName(String),
    /// 分类下仍有子分类，无法删除
    #[error("Category {category_name} still has {sub_categories} sub categories")]
    CategoryInUse {
        category_name: String,
        sub_categories: u64,
    },
    /// 存储层错误
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

fn validate_name(name: &str, draft: &impl Validate) -> Result<(), TaxonomyError> {
    if name.trim().is_empty() {
        return Err(TaxonomyError::InvalidName(
            "name must not be blank".to_string(),
        ));
    }
    draft
        .validate()
        .map_err(|e| TaxonomyError::InvalidName(e.to_string()))
}

/// 分类服务
///
/// 负责分类与子分类的增删改查，并维护"同一分类下子分类名称唯一"这一约束。
/// 每个写操作在单个工作单元内完成重名检查与写入；存储层的唯一索引冲突
/// 同样会被转换为 [`TaxonomyError::DuplicateName`]。
pub struct TaxonomyService<R: TaxonomyRepository> {
    /// 分类仓库
    repo: Arc<R>,
    /// 删除仍有子分类的分类时的策略
    delete_policy: CategoryDeletePolicy,
}

impl<R: TaxonomyRepository> TaxonomyService<R> {
    /// 使用默认删除策略（拒绝）创建分类服务
    pub fn new(repo: Arc<R>) -> Self {
        Self::with_delete_policy(repo, CategoryDeletePolicy::default())
    }

    /// 使用指定删除策略创建分类服务
    pub fn with_delete_policy(repo: Arc<R>, delete_policy: CategoryDeletePolicy) -> Self {
        Self {
            repo,
            delete_policy,
        }
    }

    /// 列出全部子分类及其所属分类
    ///
    /// 按分类名称、子分类名称排序
    pub async fn list_sub_categories(&self) -> Result<Vec<SubCategoryDetails>, TaxonomyError> {
        let sub_categories = self.repo.list_sub_categories().await?;
        tracing::debug!("Listed {} sub categories", sub_categories.len());
        Ok(sub_categories)
    }

    /// 列出全部分类
    pub async fn list_categories(&self) -> Result<Vec<Category>, TaxonomyError> {
        Ok(self.repo.list_categories().await?)
    }

    /// 列出去重并排序后的子分类名称
    pub async fn list_sub_category_names(&self) -> Result<Vec<String>, TaxonomyError> {
        Ok(self.repo.list_sub_category_names().await?)
    }

    /// 列出某个分类下的子分类
    ///
    /// 分类不存在与分类下没有子分类均返回空列表；需要区分时请使用
    /// [`TaxonomyService::get_category`]
    pub async fn sub_categories_for_category(
        &self,
        category_id: i32,
    ) -> Result<Vec<SubCategory>, TaxonomyError> {
        let sub_categories = self.repo.find_sub_categories_by_category(category_id).await?;
        tracing::debug!(
            "Found {} sub categories for category {}",
            sub_categories.len(),
            category_id
        );
        Ok(sub_categories)
    }

    /// 获取分类
    pub async fn get_category(&self, id: i32) -> Result<Option<Category>, TaxonomyError> {
        Ok(self.repo.find_category_by_id(id).await?)
    }

    /// 获取子分类详情（含所属分类）
    pub async fn get_sub_category_details(
        &self,
        id: i32,
    ) -> Result<Option<SubCategoryDetails>, TaxonomyError> {
        Ok(self.repo.find_sub_category_details(id).await?)
    }

    /// 创建子分类
    ///
    /// # 参数
    ///
    /// * `name` - 子分类名称
    /// * `category_id` - 所属分类ID
    ///
    /// # 返回值
    ///
    /// * `Ok(SubCategory)` - 带有存储层分配ID的子分类
    /// * `Err(TaxonomyError::InvalidName)` - 名称为空或过长
    /// * `Err(TaxonomyError::InvalidReference)` - 分类不存在
    /// * `Err(TaxonomyError::DuplicateName)` - 该分类下已有同名子分类
    pub async fn create_sub_category(
        &self,
        name: &str,
        category_id: i32,
    ) -> Result<SubCategory, TaxonomyError> {
        let draft = SubCategoryDraft::new(name, category_id);
        validate_name(&draft.name, &draft)?;

        let mut uow = self.repo.begin().await?;

        let category = match uow.find_category_by_id(category_id).await? {
            Some(category) => category,
            None => {
                tracing::warn!(
                    "Rejected sub category {:?}: category {} does not exist",
                    draft.name,
                    category_id
                );
                return Err(TaxonomyError::InvalidReference { category_id });
            }
        };

        let conflicts = uow
            .find_sub_categories_by_name_and_category(&draft.name, category_id, None)
            .await?;
        if !conflicts.is_empty() {
            tracing::warn!(
                "Rejected sub category {:?}: already exists under category {}",
                draft.name,
                category.name
            );
            return Err(TaxonomyError::DuplicateName {
                category_name: category.name,
            });
        }

        let created = match uow.insert_sub_category(&draft.name, category_id).await {
            Ok(created) => created,
            Err(RepositoryError::Conflict(detail)) => {
                tracing::warn!(
                    "Unique index rejected sub category {:?} under category {}: {}",
                    draft.name,
                    category.name,
                    detail
                );
                return Err(TaxonomyError::DuplicateName {
                    category_name: category.name,
                });
            }
            Err(RepositoryError::InvalidReference(_)) => {
                return Err(TaxonomyError::InvalidReference { category_id });
            }
            Err(e) => return Err(e.into()),
        };

        uow.commit().await?;

        tracing::info!(
            "Created sub category {} ({:?}) under category {}",
            created.id,
            created.name,
            category.name
        );
        Ok(created)
    }

    /// 重命名子分类
    ///
    /// 所属分类不可修改。重名检查排除记录自身，因此名称不变的更新总是成功。
    ///
    /// # 返回值
    ///
    /// * `Ok(SubCategory)` - 更新后的子分类
    /// * `Err(TaxonomyError::NotFound)` - 子分类不存在
    /// * `Err(TaxonomyError::DuplicateName)` - 该分类下已有其他同名子分类
    pub async fn update_sub_category(
        &self,
        id: i32,
        new_name: &str,
    ) -> Result<SubCategory, TaxonomyError> {
        let mut uow = self.repo.begin().await?;

        let mut sub_category = uow.find_sub_category_by_id(id).await?.ok_or(
            TaxonomyError::NotFound {
                entity: TaxonomyEntity::SubCategory,
                id,
            },
        )?;

        let draft = SubCategoryDraft::new(new_name, sub_category.category_id);
        validate_name(&draft.name, &draft)?;

        let conflicts = uow
            .find_sub_categories_by_name_and_category(
                &draft.name,
                sub_category.category_id,
                Some(id),
            )
            .await?;
        if !conflicts.is_empty() {
            let category_id = sub_category.category_id;
            let category_name = match uow.find_category_by_id(category_id).await? {
                Some(category) => category.name,
                None => return Err(TaxonomyError::InvalidReference { category_id }),
            };
            tracing::warn!(
                "Rejected rename of sub category {} to {:?}: already exists under category {}",
                id,
                draft.name,
                category_name
            );
            return Err(TaxonomyError::DuplicateName { category_name });
        }

        sub_category.name = draft.name;
        let result = uow.update_sub_category(&sub_category).await;
        let updated = match result {
            Ok(updated) => updated,
            Err(RepositoryError::Conflict(detail)) => {
                tracing::warn!(
                    "Unique index rejected rename of sub category {}: {}",
                    id,
                    detail
                );
                // 回滚后再读取分类名称
                drop(uow);
                return Err(self.duplicate_name_error(sub_category.category_id).await);
            }
            Err(RepositoryError::NotFound) => {
                return Err(TaxonomyError::NotFound {
                    entity: TaxonomyEntity::SubCategory,
                    id,
                });
            }
            Err(e) => return Err(e.into()),
        };

        uow.commit().await?;

        tracing::info!("Renamed sub category {} to {:?}", id, updated.name);
        Ok(updated)
    }

    /// 删除子分类
    ///
    /// 子分类不存在时返回 [`TaxonomyError::NotFound`]
    pub async fn delete_sub_category(&self, id: i32) -> Result<(), TaxonomyError> {
        let mut uow = self.repo.begin().await?;

        if !uow.delete_sub_category_by_id(id).await? {
            tracing::warn!("Sub category {} not found for deletion", id);
            return Err(TaxonomyError::NotFound {
                entity: TaxonomyEntity::SubCategory,
                id,
            });
        }

        uow.commit().await?;

        tracing::info!("Deleted sub category {}", id);
        Ok(())
    }

    /// 创建分类
    pub async fn create_category(&self, name: &str) -> Result<Category, TaxonomyError> {
        let draft = CategoryDraft::new(name);
        validate_name(&draft.name, &draft)?;

        let mut uow = self.repo.begin().await?;
        let created = uow.insert_category(&draft.name).await?;
        uow.commit().await?;

        tracing::info!("Created category {} ({:?})", created.id, created.name);
        Ok(created)
    }

    /// 重命名分类
    pub async fn rename_category(&self, id: i32, name: &str) -> Result<Category, TaxonomyError> {
        let mut uow = self.repo.begin().await?;

        let mut category = uow
            .find_category_by_id(id)
            .await?
            .ok_or(TaxonomyError::NotFound {
                entity: TaxonomyEntity::Category,
                id,
            })?;

        let draft = CategoryDraft::new(name);
        validate_name(&draft.name, &draft)?;

        category.name = draft.name;
        let updated = match uow.update_category(&category).await {
            Ok(updated) => updated,
            Err(RepositoryError::NotFound) => {
                return Err(TaxonomyError::NotFound {
                    entity: TaxonomyEntity::Category,
                    id,
                });
            }
            Err(e) => return Err(e.into()),
        };

        uow.commit().await?;

        tracing::info!("Renamed category {} to {:?}", id, updated.name);
        Ok(updated)
    }

    /// 删除分类
    ///
    /// # 返回值
    ///
    /// * `Ok(u64)` - 随分类一同删除的子分类数量
    /// * `Err(TaxonomyError::NotFound)` - 分类不存在
    /// * `Err(TaxonomyError::CategoryInUse)` - 删除策略为拒绝且分类下仍有子分类
    pub async fn delete_category(&self, id: i32) -> Result<u64, TaxonomyError> {
        let mut uow = self.repo.begin().await?;

        let category = uow
            .find_category_by_id(id)
            .await?
            .ok_or(TaxonomyError::NotFound {
                entity: TaxonomyEntity::Category,
                id,
            })?;

        let children = uow.count_sub_categories_for_category(id).await?;
        let removed = if children == 0 {
            0
        } else {
            match self.delete_policy {
                CategoryDeletePolicy::Restrict => {
                    tracing::warn!(
                        "Refused to delete category {}: {} sub categories remain",
                        category.name,
                        children
                    );
                    return Err(TaxonomyError::CategoryInUse {
                        category_name: category.name,
                        sub_categories: children,
                    });
                }
                CategoryDeletePolicy::Cascade => {
                    uow.delete_sub_categories_by_category(id).await?
                }
            }
        };

        match uow.delete_category_by_id(id).await {
            Ok(true) => {}
            Ok(false) => {
                return Err(TaxonomyError::NotFound {
                    entity: TaxonomyEntity::Category,
                    id,
                });
            }
            Err(RepositoryError::InvalidReference(_)) => {
                return Err(TaxonomyError::CategoryInUse {
                    category_name: category.name,
                    sub_categories: children,
                });
            }
            Err(e) => return Err(e.into()),
        }

        uow.commit().await?;

        tracing::info!(
            "Deleted category {} ({:?}) with {} sub categories",
            id,
            category.name,
            removed
        );
        Ok(removed)
    }

    async fn duplicate_name_error(&self, category_id: i32) -> TaxonomyError {
        match self.repo.find_category_by_id(category_id).await {
            Ok(Some(category)) => TaxonomyError::DuplicateName {
                category_name: category.name,
            },
            Ok(None) => TaxonomyError::InvalidReference { category_id },
            Err(e) => e.into(),
        }
    }
}

#[cfg(test)]
#[path = "taxonomy_service_test.rs"]
mod tests;
