use serde::Serialize;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// 计时指标 - 按阶段名记录每次测量的耗时
///
/// 每个阶段保存按记录顺序排列的全部样本，运行结束后可查询均值、最小值和最大值。
#[derive(Debug, Default, Clone)]
pub struct TimingMetrics {
    phases: BTreeMap<String, Vec<Duration>>,
}

/// 阶段统计信息
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseStats {
    pub count: usize,
    pub total: Duration,
    pub mean: Duration,
    pub min: Duration,
    pub max: Duration,
}

impl PhaseStats {
    fn from_samples(samples: &[Duration]) -> Option<Self> {
        let first = *samples.first()?;
        let (total, min, max) = samples.iter().skip(1).fold(
            (first, first, first),
            |(total, min, max), &d| (total + d, min.min(d), max.max(d)),
        );
        Some(Self {
            count: samples.len(),
            total,
            mean: total / samples.len() as u32,
            min,
            max,
        })
    }
}

impl TimingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次测量
    pub fn record(&mut self, phase: impl Into<String>, duration: Duration) {
        self.phases.entry(phase.into()).or_default().push(duration);
    }

    /// 阶段的全部样本（按记录顺序）
    pub fn samples(&self, phase: &str) -> &[Duration] {
        self.phases.get(phase).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 获取阶段统计信息
    pub fn stats(&self, phase: &str) -> Option<PhaseStats> {
        PhaseStats::from_samples(self.samples(phase))
    }

    /// 已记录的阶段名
    pub fn phases(&self) -> impl Iterator<Item = &str> {
        self.phases.keys().map(String::as_str)
    }

    /// 以 JSON 输出所有阶段的统计信息
    pub fn summary_json(&self) -> serde_json::Result<String> {
        let summary: BTreeMap<&str, PhaseStats> = self
            .phases
            .iter()
            .filter_map(|(name, samples)| Some((name.as_str(), PhaseStats::from_samples(samples)?)))
            .collect();
        serde_json::to_string_pretty(&summary)
    }

    /// 输出性能报告
    pub fn log_report(&self) {
        for phase in self.phases() {
            if let Some(stats) = self.stats(phase) {
                tracing::info!(
                    target: "profiling",
                    "{}: {} samples, mean: {:?}, min: {:?}, max: {:?}",
                    phase,
                    stats.count,
                    stats.mean,
                    stats.min,
                    stats.max
                );
            }
        }
    }
}

/// 计时作用域守卫 - 使用RAII自动测量
///
/// 守卫析构时把耗时记录到对应阶段。
pub struct ScopedTimer<'a> {
    metrics: &'a mut TimingMetrics,
    phase: String,
    start: Instant,
}

impl<'a> ScopedTimer<'a> {
    pub fn new(metrics: &'a mut TimingMetrics, phase: impl Into<String>) -> Self {
        Self {
            metrics,
            phase: phase.into(),
            start: Instant::now(),
        }
    }
}

impl Drop for ScopedTimer<'_> {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        self.metrics.record(std::mem::take(&mut self.phase), elapsed);
    }
}
