use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// 种子错配搜索配置，一个 factory 生命周期内不变，被它创建的所有 driver 共享。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeedConfig {
    /// 种子区允许的错配数（0..=3）
    pub seed_mms: u8,
    /// 种子长度，超过读段长度时按读段长度截断
    pub seed_len: usize,
    /// 全长错配罚分之和上限（-e）
    pub qual_cutoff: u32,
    /// 每条读段的回溯上限，只在 seed_mms >= 2 时生效
    pub max_bts: u32,
    /// 同代价候选优先选择已产出命中的链
    pub strand_fix: bool,
    /// MAQ 式罚分取整
    pub maq_penalty: bool,
    /// 回溯按质量罚分排序；关闭时只按错配数排序
    pub qual_order: bool,
    pub do_fw: bool,
    pub do_rc: bool,
    /// 每个方向的区间定位缓存条目数，0 表示不缓存
    pub cache_limit: usize,
    /// 每条读段 Branch / Edit / RangeState 池的容量
    pub pool_capacity: usize,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            seed_mms: 2,
            seed_len: 28,
            qual_cutoff: 70,
            max_bts: 125,
            strand_fix: true,
            maq_penalty: true,
            qual_order: true,
            do_fw: true,
            do_rc: true,
            cache_limit: 4096,
            pool_capacity: 1 << 20,
        }
    }
}

impl SeedConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.seed_mms > 3 {
            return Err(ConfigError::UnsupportedSeedMismatches(self.seed_mms));
        }
        if self.seed_len == 0 {
            return Err(ConfigError::ZeroSeedLength);
        }
        if self.pool_capacity == 0 {
            return Err(ConfigError::ZeroPoolCapacity);
        }
        Ok(())
    }

    /// 单端模式额外要求至少开启一条链
    pub fn validate_unpaired(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if !self.do_fw && !self.do_rc {
            return Err(ConfigError::NoStrands);
        }
        Ok(())
    }
}

/// 配对模式配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PairedConfig {
    pub seed: SeedConfig,
    /// 片段来自正链时 mate1 是否以正向出现
    pub mate1_fw: bool,
    pub mate2_fw: bool,
    /// 片段长度下限（-I）
    pub pe_inner: u32,
    /// 片段长度上限（-X）
    pub pe_outer: u32,
    /// 不做配对，两个 mate 各自独立报告
    pub dont_reconcile: bool,
    /// 每个 mate 为对称配对保留的命中数上限
    pub sym_ceil: u32,
    /// 某 mate 的命中数超过该值后，以它的每个命中为锚点扫描参考窗口找另一 mate，
    /// 另一 mate 的索引搜索暂停到扫描次数用完
    pub mixed_thresh: u32,
    /// 每对读段最多的窗口扫描次数
    pub mixed_attempt_lim: u32,
    /// 配对失败时退回为两个 mate 各报告首个命中
    pub fallback_unpaired: bool,
}

impl Default for PairedConfig {
    fn default() -> Self {
        Self {
            seed: SeedConfig::default(),
            mate1_fw: true,
            mate2_fw: false,
            pe_inner: 0,
            pe_outer: 250,
            dont_reconcile: false,
            sym_ceil: 100,
            mixed_thresh: 4,
            mixed_attempt_lim: 100,
            fallback_unpaired: false,
        }
    }
}

impl PairedConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.seed.validate()?;
        if self.pe_inner > self.pe_outer {
            return Err(ConfigError::EmptyPairWindow { inner: self.pe_inner, outer: self.pe_outer });
        }
        if self.mate_strands().iter().flatten().all(|&on| !on) {
            return Err(ConfigError::NoMateStrands);
        }
        Ok(())
    }

    /// 由 doFw/doRc 与两个 mate 的方向推出需要搜索的 [mate][strand] 组合。
    /// 下标：mate 0/1，strand 0 = 正向，1 = 反向互补。
    pub fn mate_strands(&self) -> [[bool; 2]; 2] {
        let mut on = [[true; 2]; 2];
        let fw_slot = |mate_fw: bool| if mate_fw { 0 } else { 1 };
        if !self.seed.do_fw {
            on[0][fw_slot(self.mate1_fw)] = false;
            on[1][fw_slot(self.mate2_fw)] = false;
        }
        if !self.seed.do_rc {
            on[0][1 - fw_slot(self.mate1_fw)] = false;
            on[1][1 - fw_slot(self.mate2_fw)] = false;
        }
        on
    }
}
