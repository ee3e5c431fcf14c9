// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// 菜品分类实体
///
/// 分类是菜品目录的顶层节点，被零个或多个子分类引用。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// 分类ID，由存储层在创建时分配
    pub id: i32,
    /// 分类名称，用于展示
    pub name: String,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

/// 待创建或重命名的分类
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CategoryDraft {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

impl CategoryDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// 删除仍有子分类的分类时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CategoryDeletePolicy {
    /// 拒绝删除
    #[default]
    Restrict,
    /// 同时删除全部子分类
    Cascade,
}
