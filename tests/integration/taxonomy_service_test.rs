// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{create_file_test_db, create_test_app, create_test_app_with_policy};
use catalogrs::domain::models::category::CategoryDeletePolicy;
use catalogrs::domain::services::taxonomy_service::{
    TaxonomyEntity, TaxonomyError, TaxonomyService,
};
use catalogrs::infrastructure::repositories::taxonomy_repo_impl::TaxonomyRepositoryImpl;
use std::sync::Arc;

/// 完整的分类生命周期
///
/// Beverages/Snacks 两个分类下创建、重命名、删除子分类
#[tokio::test]
async fn test_sub_category_lifecycle() {
    let app = create_test_app().await;
    let service = &app.service;

    let beverages = service.create_category("Beverages").await.unwrap();
    let snacks = service.create_category("Snacks").await.unwrap();

    let soda = service
        .create_sub_category("Soda", beverages.id)
        .await
        .unwrap();
    assert_eq!(soda.name, "Soda");
    assert_eq!(soda.category_id, beverages.id);

    let duplicate = service.create_sub_category("Soda", beverages.id).await;
    match duplicate {
        Err(TaxonomyError::DuplicateName { category_name }) => {
            assert_eq!(category_name, "Beverages")
        }
        other => panic!("expected DuplicateName, got {:?}", other),
    }

    let snack_soda = service.create_sub_category("Soda", snacks.id).await.unwrap();
    assert_ne!(snack_soda.id, soda.id);

    let cola = service.update_sub_category(soda.id, "Cola").await.unwrap();
    assert_eq!(cola.id, soda.id);
    assert_eq!(cola.name, "Cola");
    assert_eq!(cola.category_id, beverages.id);

    // 名称不变的更新不与自身冲突
    let unchanged = service.update_sub_category(soda.id, "Cola").await.unwrap();
    assert_eq!(unchanged.name, "Cola");

    service.delete_sub_category(soda.id).await.unwrap();
    assert!(service
        .get_sub_category_details(soda.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_only_one_of_two_identical_creates_succeeds() {
    let app = create_test_app().await;
    let service = &app.service;
    let beverages = service.create_category("Beverages").await.unwrap();

    let (first, second) = tokio::join!(
        service.create_sub_category("Juice", beverages.id),
        service.create_sub_category("Juice", beverages.id),
    );

    let successes = [&first, &second].iter().filter(|r| r.is_ok()).count();
    let duplicates = [&first, &second]
        .iter()
        .filter(|r| matches!(r, Err(TaxonomyError::DuplicateName { .. })))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(duplicates, 1);

    let juices = service
        .sub_categories_for_category(beverages.id)
        .await
        .unwrap();
    assert_eq!(juices.len(), 1);
}

/// 多连接的文件数据库上并发创建同名子分类
///
/// 失败的一方必须得到 DuplicateName，而不是数据库锁错误
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_identical_creates_on_pooled_file_database() {
    let dir = tempfile::tempdir().unwrap();
    let db = create_file_test_db(dir.path()).await;
    let service = Arc::new(TaxonomyService::new(Arc::new(TaxonomyRepositoryImpl::new(
        db,
    ))));
    let beverages = service.create_category("Beverages").await.unwrap();
    let category_id = beverages.id;

    for round in 0..20 {
        let name = format!("Juice{}", round);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let service = service.clone();
                let name = name.clone();
                tokio::spawn(async move { service.create_sub_category(&name, category_id).await })
            })
            .collect();

        let mut successes = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(TaxonomyError::DuplicateName { category_name }) => {
                    assert_eq!(category_name, "Beverages");
                    duplicates += 1;
                }
                Err(other) => panic!("round {}: unexpected error {:?}", round, other),
            }
        }
        assert_eq!(successes, 1, "round {}", round);
        assert_eq!(duplicates, 3, "round {}", round);
    }

    let created = service
        .sub_categories_for_category(beverages.id)
        .await
        .unwrap();
    assert_eq!(created.len(), 20);
}

#[tokio::test]
async fn test_rename_onto_sibling_name_is_rejected() {
    let app = create_test_app().await;
    let service = &app.service;
    let beverages = service.create_category("Beverages").await.unwrap();
    let tea = service.create_sub_category("Tea", beverages.id).await.unwrap();
    service
        .create_sub_category("Coffee", beverages.id)
        .await
        .unwrap();

    let result = service.update_sub_category(tea.id, "Coffee").await;

    assert!(matches!(
        result,
        Err(TaxonomyError::DuplicateName { ref category_name }) if category_name == "Beverages"
    ));
    let details = service
        .get_sub_category_details(tea.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(details.sub_category.name, "Tea");
}

#[tokio::test]
async fn test_names_are_compared_case_sensitively() {
    let app = create_test_app().await;
    let service = &app.service;
    let beverages = service.create_category("Beverages").await.unwrap();

    service.create_sub_category("Soda", beverages.id).await.unwrap();
    let lower = service.create_sub_category("soda", beverages.id).await;

    assert!(lower.is_ok());
}

#[tokio::test]
async fn test_missing_ids_are_reported_not_found() {
    let app = create_test_app().await;
    let service = &app.service;

    assert!(matches!(
        service.update_sub_category(999, "Cola").await,
        Err(TaxonomyError::NotFound {
            entity: TaxonomyEntity::SubCategory,
            id: 999
        })
    ));
    assert!(matches!(
        service.delete_sub_category(999).await,
        Err(TaxonomyError::NotFound { id: 999, .. })
    ));
    assert!(service.get_sub_category_details(999).await.unwrap().is_none());
    assert!(service.get_category(999).await.unwrap().is_none());
}

#[tokio::test]
async fn test_create_under_missing_category_is_invalid_reference() {
    let app = create_test_app().await;

    let result = app.service.create_sub_category("Soda", 42).await;

    assert!(matches!(
        result,
        Err(TaxonomyError::InvalidReference { category_id: 42 })
    ));
}

#[tokio::test]
async fn test_blank_names_are_rejected() {
    let app = create_test_app().await;
    let service = &app.service;
    let beverages = service.create_category("Beverages").await.unwrap();
    let soda = service.create_sub_category("Soda", beverages.id).await.unwrap();

    assert!(matches!(
        service.create_sub_category("", beverages.id).await,
        Err(TaxonomyError::InvalidName(_))
    ));
    assert!(matches!(
        service.update_sub_category(soda.id, "  ").await,
        Err(TaxonomyError::InvalidName(_))
    ));
    assert!(matches!(
        service.create_category("").await,
        Err(TaxonomyError::InvalidName(_))
    ));
}

#[tokio::test]
async fn test_listing_joins_parent_and_orders_by_category_then_name() {
    let app = create_test_app().await;
    let service = &app.service;
    let snacks = service.create_category("Snacks").await.unwrap();
    let beverages = service.create_category("Beverages").await.unwrap();
    service.create_sub_category("Chips", snacks.id).await.unwrap();
    service.create_sub_category("Tea", beverages.id).await.unwrap();
    service.create_sub_category("Coffee", beverages.id).await.unwrap();

    let listed = service.list_sub_categories().await.unwrap();
    let labels: Vec<(String, String)> = listed
        .iter()
        .map(|d| (d.category.name.clone(), d.sub_category.name.clone()))
        .collect();

    assert_eq!(
        labels,
        vec![
            ("Beverages".to_string(), "Coffee".to_string()),
            ("Beverages".to_string(), "Tea".to_string()),
            ("Snacks".to_string(), "Chips".to_string()),
        ]
    );
    for details in &listed {
        assert_eq!(details.sub_category.category_id, details.category.id);
    }
}

#[tokio::test]
async fn test_sub_categories_for_category_filters_by_parent() {
    let app = create_test_app().await;
    let service = &app.service;
    let beverages = service.create_category("Beverages").await.unwrap();
    let snacks = service.create_category("Snacks").await.unwrap();
    service.create_sub_category("Tea", beverages.id).await.unwrap();
    service.create_sub_category("Coffee", beverages.id).await.unwrap();
    service.create_sub_category("Chips", snacks.id).await.unwrap();

    let drinks = service
        .sub_categories_for_category(beverages.id)
        .await
        .unwrap();
    let names: Vec<&str> = drinks.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Coffee", "Tea"]);

    // 不存在的分类与空分类一样返回空列表
    assert!(service
        .sub_categories_for_category(999)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_sub_category_names_are_distinct_and_sorted() {
    let app = create_test_app().await;
    let service = &app.service;
    let beverages = service.create_category("Beverages").await.unwrap();
    let snacks = service.create_category("Snacks").await.unwrap();
    service.create_sub_category("Soda", beverages.id).await.unwrap();
    service.create_sub_category("Soda", snacks.id).await.unwrap();
    service.create_sub_category("Chips", snacks.id).await.unwrap();

    let names = service.list_sub_category_names().await.unwrap();

    assert_eq!(names, vec!["Chips".to_string(), "Soda".to_string()]);
}

#[tokio::test]
async fn test_rename_category() {
    let app = create_test_app().await;
    let service = &app.service;
    let drinks = service.create_category("Drinks").await.unwrap();

    let renamed = service.rename_category(drinks.id, "Beverages").await.unwrap();

    assert_eq!(renamed.id, drinks.id);
    assert_eq!(renamed.name, "Beverages");
    assert!(matches!(
        service.rename_category(999, "Nope").await,
        Err(TaxonomyError::NotFound {
            entity: TaxonomyEntity::Category,
            ..
        })
    ));
}

#[tokio::test]
async fn test_restrict_policy_keeps_category_with_children() {
    let app = create_test_app().await;
    let service = &app.service;
    let beverages = service.create_category("Beverages").await.unwrap();
    service.create_sub_category("Soda", beverages.id).await.unwrap();

    let result = service.delete_category(beverages.id).await;

    assert!(matches!(
        result,
        Err(TaxonomyError::CategoryInUse {
            sub_categories: 1,
            ..
        })
    ));
    assert!(service.get_category(beverages.id).await.unwrap().is_some());

    let empty = service.create_category("Empty").await.unwrap();
    assert_eq!(service.delete_category(empty.id).await.unwrap(), 0);
    assert!(service.get_category(empty.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_cascade_policy_removes_children() {
    let app = create_test_app_with_policy(CategoryDeletePolicy::Cascade).await;
    let service = &app.service;
    let beverages = service.create_category("Beverages").await.unwrap();
    let snacks = service.create_category("Snacks").await.unwrap();
    service.create_sub_category("Soda", beverages.id).await.unwrap();
    service.create_sub_category("Tea", beverages.id).await.unwrap();
    service.create_sub_category("Chips", snacks.id).await.unwrap();

    let removed = service.delete_category(beverages.id).await.unwrap();

    assert_eq!(removed, 2);
    let remaining = service.list_sub_categories().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].category.name, "Snacks");
    assert!(matches!(
        service.delete_category(beverages.id).await,
        Err(TaxonomyError::NotFound { .. })
    ));
}
