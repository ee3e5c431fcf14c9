// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use catalogrs::config::settings::Settings;
use catalogrs::domain::services::taxonomy_service::TaxonomyService;
use catalogrs::infrastructure::database::connection;
use catalogrs::infrastructure::repositories::taxonomy_repo_impl::TaxonomyRepositoryImpl;
use catalogrs::utils::telemetry;
use migration::{Migrator, MigratorTrait};
use std::sync::Arc;
use tracing::info;

/// 主函数
///
/// 初始化日志、配置和数据库，应用迁移后输出当前分类概况
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration
    let settings = Settings::new()?;

    // 2. Initialize logging
    telemetry::init_telemetry(&settings.telemetry);
    info!("Starting catalogrs...");
    info!("Configuration loaded");

    // 3. Connect to database
    let db = connection::create_pool(&settings.database).await?;
    let db = Arc::new(db);
    info!("Database connection established");

    if settings.database.run_migrations {
        info!("Running database migrations...");
        Migrator::up(db.as_ref(), None).await?;
        info!("Database migrations applied");
    }

    // 4. Initialize taxonomy service
    let repo = Arc::new(TaxonomyRepositoryImpl::new(db.clone()));
    let service =
        TaxonomyService::with_delete_policy(repo, settings.taxonomy.category_delete_policy);
    info!(
        "Taxonomy service ready (category delete policy: {:?})",
        settings.taxonomy.category_delete_policy
    );

    // 5. Report current taxonomy
    let categories = service.list_categories().await?;
    let sub_categories = service.list_sub_categories().await?;
    info!(
        "Catalog holds {} categories and {} sub categories",
        categories.len(),
        sub_categories.len()
    );
    for details in &sub_categories {
        info!(
            "  {} / {} (id {})",
            details.category.name, details.sub_category.name, details.sub_category.id
        );
    }

    Ok(())
}
