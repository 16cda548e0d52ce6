//! 需求扰动
//!
//! 每个需求 `d` 从 `Normal(d, d / 30)` 重新采样，截断到 `[0, f64::MAX]` 后
//! 保留一位小数。第 `i` 次试验使用种子下编号为 `i` 的 ChaCha 流，
//! 因此任意一次试验都可以单独重现。

use crate::error::Result;
use crate::od::OdMatrix;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use tracing::debug;

/// 标准差与需求之比：`d / NOISE_DIVISOR`
pub const NOISE_DIVISOR: f64 = 30.0;

/// 基准矩阵扰动副本的惰性有限序列
pub struct Perturbations<'a> {
    baseline: &'a OdMatrix,
    seed: u64,
    next: usize,
    count: usize,
}

/// 返回 `trial_count` 个按需生成的扰动矩阵
pub fn perturb(baseline: &OdMatrix, trial_count: usize, seed: u64) -> Result<Perturbations<'_>> {
    baseline.validate()?;
    Ok(Perturbations {
        baseline,
        seed,
        next: 0,
        count: trial_count,
    })
}

impl Iterator for Perturbations<'_> {
    type Item = OdMatrix;

    fn next(&mut self) -> Option<OdMatrix> {
        if self.next >= self.count {
            return None;
        }
        let idx = self.next;
        self.next += 1;
        Some(draw(self.baseline, idx, self.seed))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.count - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Perturbations<'_> {}

/// 单次试验的扰动，与 [`perturb`] 的第 `trial_index` 项相同
pub fn perturb_trial(baseline: &OdMatrix, trial_index: usize, seed: u64) -> Result<OdMatrix> {
    baseline.validate()?;
    Ok(draw(baseline, trial_index, seed))
}

fn trial_rng(trial_index: usize, seed: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(trial_index as u64);
    rng
}

// 基准已校验：每个需求都有限且非负
fn draw(baseline: &OdMatrix, trial_index: usize, seed: u64) -> OdMatrix {
    let mut rng = trial_rng(trial_index, seed);
    let demands: Vec<f64> = baseline
        .records()
        .iter()
        .map(|r| perturb_demand(r.demand, &mut rng))
        .collect();
    let perturbed = baseline.with_demands(&demands);
    debug!(
        trial = trial_index,
        total_demand = perturbed.total_demand(),
        "🎲 生成扰动"
    );
    perturbed
}

fn perturb_demand(demand: f64, rng: &mut ChaCha8Rng) -> f64 {
    if demand == 0.0 {
        return 0.0;
    }
    let sampled = match Normal::new(demand, demand / NOISE_DIVISOR) {
        Ok(normal) => normal.sample(rng),
        Err(_) => demand,
    };
    // 极大需求的采样可能溢出为 inf
    round_one_decimal(sampled.clamp(0.0, f64::MAX))
}

/// 超过该值的 f64 都是整数，无需舍入
const INTEGRAL_ABOVE: f64 = 4_503_599_627_370_496.0; // 2^52

/// 保留一位小数
pub fn round_one_decimal(x: f64) -> f64 {
    if x.abs() >= INTEGRAL_ABOVE {
        return x;
    }
    (x * 10.0).round() / 10.0
}

