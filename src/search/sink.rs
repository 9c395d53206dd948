use super::range::ResolvedMatch;

/// 命中接收方。返回 false 表示不再需要当前读段的更多命中。
pub trait HitSink {
    fn report(&mut self, hit: &ResolvedMatch) -> bool;

    /// 一对协调后的 mate
    fn report_pair(&mut self, mate1: &ResolvedMatch, mate2: &ResolvedMatch) -> bool;

    /// 新读段开始
    fn begin_read(&mut self) {}
}

/// 收集到内存，可选每读段上限（-k）
#[derive(Debug, Default)]
pub struct CollectSink {
    pub hits: Vec<ResolvedMatch>,
    pub pairs: Vec<(ResolvedMatch, ResolvedMatch)>,
    limit: Option<usize>,
    this_read: usize,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self { limit: Some(limit), ..Self::default() }
    }

    pub fn clear(&mut self) {
        self.hits.clear();
        self.pairs.clear();
        self.this_read = 0;
    }

    fn room(&mut self) -> bool {
        self.this_read += 1;
        self.limit.map_or(true, |k| self.this_read < k)
    }
}

impl HitSink for CollectSink {
    fn report(&mut self, hit: &ResolvedMatch) -> bool {
        self.hits.push(hit.clone());
        self.room()
    }

    fn report_pair(&mut self, mate1: &ResolvedMatch, mate2: &ResolvedMatch) -> bool {
        self.pairs.push((mate1.clone(), mate2.clone()));
        self.room()
    }

    fn begin_read(&mut self) {
        self.this_read = 0;
    }
}
