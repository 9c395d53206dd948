//! 种子错配回溯搜索层。
//!
//! 从下到上：
//! - `source`：单方向、单链的基本回溯搜索（`ElementarySearch`）
//! - `pin` / `budget`：钉住边界与每读段共享的回溯上限
//! - `driver`：`SearchDriver` 接口与基本搜索的包装、验证 driver 工厂
//! - `seeded`：种子生成 + 验证的两阶段组合
//! - `cost_aware`：按代价合并多个 driver
//! - `resolve`：区间定位、LRU 缓存与去重
//! - `strategy`：按错配数查表组装
//! - `unpaired` / `paired`：对外的 aligner 与 factory

pub mod arena;
pub mod budget;
pub mod config;
pub mod cost_aware;
pub mod driver;
pub mod error;
pub mod paired;
pub mod pin;
pub mod range;
pub mod read;
pub mod refaligner;
pub mod resolve;
pub mod seeded;
pub mod sink;
pub mod source;
pub mod strategy;
pub mod unpaired;

pub use config::{PairedConfig, SeedConfig};
pub use cost_aware::CostAwareSearchDriver;
pub use driver::{SearchDriver, SearchEnv};
pub use error::{ConfigError, SearchError};
pub use paired::{PairedAligner, PairedAlignerFactory};
pub use range::{Cost, Edit, Range, ResolvedMatch};
pub use read::{Mate, Read, Strand};
pub use resolve::{MatchResolver, RangeCache, RangeCaches};
pub use sink::{CollectSink, HitSink};
pub use unpaired::{PairOutcome, ReadOutcome, UnpairedAligner, UnpairedAlignerFactory};

/// 每个 worker 调用一次 `create`，得到完全私有的搜索图；factory 本身可跨线程共享
pub trait AlignerFactory: Sync {
    type Aligner;

    fn create(&self) -> Self::Aligner;
}
