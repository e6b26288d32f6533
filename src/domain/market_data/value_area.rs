use serde::{Deserialize, Serialize};

/// Market-profile value area over one depth snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueArea {
    pub poc: f64,
    pub vah: f64,
    pub val: f64,
    pub volume_covered: f64,
    pub total_volume: f64,
}

impl ValueArea {
    /// Grow outward from the point of control until `fraction` of total volume
    /// is covered or both sides run out.
    ///
    /// `levels` are `(price, quantity)` pairs in any order; duplicate prices are
    /// summed. Each step adds whichever neighbor holds more volume, the lower
    /// one on a tie. Returns `None` when there's no positive volume.
    pub fn compute(levels: &[(f64, f64)], fraction: f64) -> Option<Self> {
        let mut merged: Vec<(f64, f64)> = levels
            .iter()
            .copied()
            .filter(|(p, q)| p.is_finite() && q.is_finite() && *q > 0.0)
            .collect();
        merged.sort_by(|a, b| a.0.total_cmp(&b.0));
        merged.dedup_by(|next, kept| {
            if next.0 == kept.0 {
                kept.1 += next.1;
                true
            } else {
                false
            }
        });

        let total: f64 = merged.iter().map(|(_, q)| q).sum();
        if merged.is_empty() || total <= 0.0 {
            return None;
        }

        let mut poc = 0;
        for (i, level) in merged.iter().enumerate() {
            if level.1 > merged[poc].1 {
                poc = i;
            }
        }

        let target = total * fraction.clamp(0.0, 1.0);
        let (mut lo, mut hi) = (poc, poc);
        let mut covered = merged[poc].1;

        while covered < target {
            let below = lo.checked_sub(1).map(|i| merged[i].1);
            let above = merged.get(hi + 1).map(|l| l.1);
            match (below, above) {
                (None, None) => break,
                (Some(b), Some(a)) if b >= a => {
                    lo -= 1;
                    covered += b;
                }
                (Some(b), None) => {
                    lo -= 1;
                    covered += b;
                }
                (_, Some(a)) => {
                    hi += 1;
                    covered += a;
                }
            }
        }

        Some(Self {
            poc: merged[poc].0,
            vah: merged[hi].0,
            val: merged[lo].0,
            volume_covered: covered,
            total_volume: total,
        })
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.val && price <= self.vah
    }

    /// Share of total volume inside the area, 0..=1.
    pub fn coverage(&self) -> f64 {
        if self.total_volume > 0.0 { self.volume_covered / self.total_volume } else { 0.0 }
    }
}
