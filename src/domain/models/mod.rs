// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了菜品目录的两级分类结构：
/// - 分类（category）：顶层分组
/// - 子分类（sub_category）：隶属于某个分类的二级条目
pub mod category;
pub mod sub_category;
