// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::category::Category;
use crate::domain::models::sub_category::{SubCategory, SubCategoryDetails};
use crate::domain::repositories::taxonomy_repository::{
    RepositoryError, TaxonomyRepository, TaxonomyUnitOfWork,
};
use crate::infrastructure::database::entities::{
    category as category_entity, sub_category as sub_category_entity,
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection,
    DatabaseTransaction, DbErr, EntityTrait, NotSet, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, SqlErr, TransactionTrait,
};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// 分类仓库实现
///
/// 基于SeaORM实现的分类与子分类数据访问层
#[derive(Clone)]
pub struct TaxonomyRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
    /// SQLite 写锁
    ///
    /// SQLite 的延迟事务在读后升级为写锁时会直接返回 SQLITE_BUSY，
    /// 因此该后端上的工作单元逐个执行
    write_lock: Arc<Mutex<()>>,
}

impl TaxonomyRepositoryImpl {
    /// 创建新的分类仓库实例
    ///
    /// # 参数
    ///
    /// * `db` - 数据库连接
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            write_lock: Arc::new(Mutex::new(())),
        }
    }
}

/// 基于数据库事务的工作单元
///
/// 丢弃未提交的实例时，SeaORM 会回滚事务
pub struct TaxonomyUnitOfWorkImpl {
    txn: Option<DatabaseTransaction>,
    // 必须在 txn 之后声明：事务先回滚，再释放写锁
    write_guard: Option<OwnedMutexGuard<()>>,
}

impl TaxonomyUnitOfWorkImpl {
    fn txn(&self) -> Result<&DatabaseTransaction, RepositoryError> {
        self.txn.as_ref().ok_or_else(|| {
            RepositoryError::Database(DbErr::Custom(
                "Unit of work already committed".to_string(),
            ))
        })
    }
}

impl From<category_entity::Model> for Category {
    fn from(model: category_entity::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<sub_category_entity::Model> for SubCategory {
    fn from(model: sub_category_entity::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            category_id: model.category_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// 将写操作的数据库错误转换为仓库错误
///
/// 唯一约束与外键约束冲突会被识别为独立的错误类型
fn map_write_error(err: DbErr) -> RepositoryError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => RepositoryError::Conflict(detail),
        Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
            RepositoryError::InvalidReference(detail)
        }
        _ => match err {
            DbErr::RecordNotUpdated => RepositoryError::NotFound,
            other => RepositoryError::Database(other),
        },
    }
}

fn into_details(
    (sub_category, category): (sub_category_entity::Model, Option<category_entity::Model>),
) -> Result<SubCategoryDetails, RepositoryError> {
    let category = category.ok_or_else(|| {
        RepositoryError::Database(DbErr::RecordNotFound(format!(
            "category {} referenced by sub category {}",
            sub_category.category_id, sub_category.id
        )))
    })?;

    Ok(SubCategoryDetails {
        sub_category: sub_category.into(),
        category: category.into(),
    })
}

async fn find_category<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<Option<Category>, RepositoryError> {
    let model = category_entity::Entity::find_by_id(id).one(db).await?;
    Ok(model.map(Into::into))
}

async fn find_sub_category<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<Option<SubCategory>, RepositoryError> {
    let model = sub_category_entity::Entity::find_by_id(id).one(db).await?;
    Ok(model.map(Into::into))
}

#[async_trait]
impl TaxonomyRepository for TaxonomyRepositoryImpl {
    async fn find_category_by_id(&self, id: i32) -> Result<Option<Category>, RepositoryError> {
        find_category(self.db.as_ref(), id).await
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let models = category_entity::Entity::find()
            .order_by_asc(category_entity::Column::Id)
            .all(self.db.as_ref())
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn list_sub_categories(&self) -> Result<Vec<SubCategoryDetails>, RepositoryError> {
        let rows = sub_category_entity::Entity::find()
            .find_also_related(category_entity::Entity)
            .order_by_asc(category_entity::Column::Name)
            .order_by_asc(sub_category_entity::Column::Name)
            .order_by_asc(sub_category_entity::Column::Id)
            .all(self.db.as_ref())
            .await?;

        rows.into_iter().map(into_details).collect()
    }

    async fn list_sub_category_names(&self) -> Result<Vec<String>, RepositoryError> {
        let names: Vec<String> = sub_category_entity::Entity::find()
            .select_only()
            .column(sub_category_entity::Column::Name)
            .distinct()
            .order_by_asc(sub_category_entity::Column::Name)
            .into_tuple()
            .all(self.db.as_ref())
            .await?;

        Ok(names)
    }

    async fn find_sub_categories_by_category(
        &self,
        category_id: i32,
    ) -> Result<Vec<SubCategory>, RepositoryError> {
        let models = sub_category_entity::Entity::find()
            .filter(sub_category_entity::Column::CategoryId.eq(category_id))
            .order_by_asc(sub_category_entity::Column::Name)
            .all(self.db.as_ref())
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn find_sub_category_details(
        &self,
        id: i32,
    ) -> Result<Option<SubCategoryDetails>, RepositoryError> {
        let row = sub_category_entity::Entity::find_by_id(id)
            .find_also_related(category_entity::Entity)
            .one(self.db.as_ref())
            .await?;

        row.map(into_details).transpose()
    }

    async fn begin(&self) -> Result<Box<dyn TaxonomyUnitOfWork>, RepositoryError> {
        let write_guard = match self.db.get_database_backend() {
            DatabaseBackend::Sqlite => Some(self.write_lock.clone().lock_owned().await),
            _ => None,
        };
        let txn = self.db.begin().await?;
        Ok(Box::new(TaxonomyUnitOfWorkImpl {
            txn: Some(txn),
            write_guard,
        }))
    }
}

#[async_trait]
impl TaxonomyUnitOfWork for TaxonomyUnitOfWorkImpl {
    async fn find_category_by_id(&self, id: i32) -> Result<Option<Category>, RepositoryError> {
        find_category(self.txn()?, id).await
    }

    async fn find_sub_category_by_id(
        &self,
        id: i32,
    ) -> Result<Option<SubCategory>, RepositoryError> {
        find_sub_category(self.txn()?, id).await
    }

    async fn find_sub_categories_by_name_and_category(
        &self,
        name: &str,
        category_id: i32,
        exclude_id: Option<i32>,
    ) -> Result<Vec<SubCategory>, RepositoryError> {
        let mut query = sub_category_entity::Entity::find()
            .filter(sub_category_entity::Column::Name.eq(name))
            .filter(sub_category_entity::Column::CategoryId.eq(category_id));

        if let Some(exclude_id) = exclude_id {
            query = query.filter(sub_category_entity::Column::Id.ne(exclude_id));
        }

        let models = query.all(self.txn()?).await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn count_sub_categories_for_category(
        &self,
        category_id: i32,
    ) -> Result<u64, RepositoryError> {
        let count = sub_category_entity::Entity::find()
            .filter(sub_category_entity::Column::CategoryId.eq(category_id))
            .count(self.txn()?)
            .await?;
        Ok(count)
    }

    async fn insert_category(&self, name: &str) -> Result<Category, RepositoryError> {
        let now = Utc::now();
        let model = category_entity::ActiveModel {
            id: NotSet,
            name: Set(name.to_owned()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let inserted = model.insert(self.txn()?).await.map_err(map_write_error)?;
        Ok(inserted.into())
    }

    async fn update_category(&self, category: &Category) -> Result<Category, RepositoryError> {
        let model = category_entity::ActiveModel {
            id: Set(category.id),
            name: Set(category.name.clone()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };

        let updated = model.update(self.txn()?).await.map_err(map_write_error)?;
        Ok(updated.into())
    }

    async fn delete_category_by_id(&self, id: i32) -> Result<bool, RepositoryError> {
        let result = category_entity::Entity::delete_by_id(id)
            .exec(self.txn()?)
            .await
            .map_err(map_write_error)?;
        Ok(result.rows_affected > 0)
    }

    async fn delete_sub_categories_by_category(
        &self,
        category_id: i32,
    ) -> Result<u64, RepositoryError> {
        let result = sub_category_entity::Entity::delete_many()
            .filter(sub_category_entity::Column::CategoryId.eq(category_id))
            .exec(self.txn()?)
            .await?;
        Ok(result.rows_affected)
    }

    async fn insert_sub_category(
        &self,
        name: &str,
        category_id: i32,
    ) -> Result<SubCategory, RepositoryError> {
        let now = Utc::now();
        let model = sub_category_entity::ActiveModel {
            id: NotSet,
            name: Set(name.to_owned()),
            category_id: Set(category_id),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let inserted = model.insert(self.txn()?).await.map_err(map_write_error)?;
        Ok(inserted.into())
    }

    async fn update_sub_category(
        &self,
        sub_category: &SubCategory,
    ) -> Result<SubCategory, RepositoryError> {
        // category_id 不可修改，只更新名称
        let model = sub_category_entity::ActiveModel {
            id: Set(sub_category.id),
            name: Set(sub_category.name.clone()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };

        let updated = model.update(self.txn()?).await.map_err(map_write_error)?;
        Ok(updated.into())
    }

    async fn delete_sub_category_by_id(&self, id: i32) -> Result<bool, RepositoryError> {
        let result = sub_category_entity::Entity::delete_by_id(id)
            .exec(self.txn()?)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn commit(&mut self) -> Result<(), RepositoryError> {
        let txn = self.txn.take().ok_or_else(|| {
            RepositoryError::Database(DbErr::Custom(
                "Unit of work already committed".to_string(),
            ))
        })?;
        txn.commit().await?;
        self.write_guard.take();
        Ok(())
    }
}
