// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::category::Category;

/// 子分类实体
///
/// 每个子分类恰好属于一个分类，`category_id` 创建后不可修改。
/// 同一分类下子分类名称唯一（区分大小写）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubCategory {
    /// 子分类ID，由存储层在创建时分配
    pub id: i32,
    /// 子分类名称
    pub name: String,
    /// 所属分类ID
    pub category_id: i32,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

/// 子分类及其所属分类
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubCategoryDetails {
    pub sub_category: SubCategory,
    pub category: Category,
}

/// 待创建的子分类
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubCategoryDraft {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub category_id: i32,
}

impl SubCategoryDraft {
    pub fn new(name: impl Into<String>, category_id: i32) -> Self {
        Self {
            name: name.into(),
            category_id,
        }
    }
}
