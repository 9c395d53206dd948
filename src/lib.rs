//! # seedmm-rust
//!
//! 基于双向 FM 索引的种子错配回溯搜索，面向短读段比对。
//!
//! 本 crate 提供：
//!
//! - **索引构建**：从 FASTA 参考序列构建正向与镜像两个 FM 索引（后缀数组 + BWT + 采样 SA）
//! - **回溯搜索**：种子区内 0–3 个错配、按质量罚分排序的回溯，支持钉住边界与回溯上限
//! - **策略组合**：精确优先、种子生成 + 验证、半区各一错配三种子搜索按代价合并
//! - **命中解析**：区间定位（LRU 缓存）与去重
//! - **双端协调**：片段长度窗口内配对，重复 mate 改为参考窗口扫描
//!
//! ## 快速示例
//!
//! ```rust,no_run
//! use seedmm_rust::index::ReferenceIndex;
//! use seedmm_rust::search::{
//!     AlignerFactory, CollectSink, Read, SeedConfig, UnpairedAlignerFactory,
//! };
//!
//! let refs = vec![("chr1".to_string(), b"ACGTACGTAGCTGATCGTAGGATCCA".to_vec())];
//! let index = ReferenceIndex::build(&refs, 64, 8)?;
//!
//! let cfg = SeedConfig { seed_mms: 1, seed_len: 12, ..SeedConfig::default() };
//! let factory = UnpairedAlignerFactory::new(&index, cfg)?;
//! let mut aligner = factory.create();
//!
//! let mut sink = CollectSink::new();
//! let read = Read::with_uniform_quality("r1", b"GCTGATCGTTGG", b'I');
//! let outcome = aligner.align(&read, &mut sink)?;
//! println!("{} hit(s), {} range(s)", sink.hits.len(), outcome.ranges);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## 模块说明
//!
//! - [`io`] — FASTA / FASTQ 解析与命中输出
//! - [`index`] — 索引构建与 `SearchIndex` / `ReferenceBases` 接口
//! - [`search`] — 回溯搜索、策略组合、解析与双端协调
//! - [`util`] — DNA 编码 / 反向互补 / 质量罚分等工具函数

pub mod index;
pub mod io;
pub mod search;
pub mod util;
