//! # Curator Testing Utils
//!
//! 各个 crate 共享的测试工具：
//!
//! - **Mock Repositories**: 所有仓储接口的内存实现
//! - **Mock Site / Sink**: 可编排返回结果的站点与推送目标
//! - **Builders**: 测试数据构造器
//! - **Helpers**: 名称映射数据集等临时文件
//!
//! ```toml
//! [dev-dependencies]
//! curator-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

pub use builders::*;
pub use helpers::*;
pub use mocks::*;
