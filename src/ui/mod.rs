//! 交互层入口。
//!
//! 只有一套基于标准输入输出的交互实现。

pub mod noui;
