// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 包含的服务：
/// - 分类服务（taxonomy_service）：分类与子分类的增删改查，维护子分类名称唯一约束
pub mod taxonomy_service;
