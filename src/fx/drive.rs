use std::sync::Arc;

/// Resolution of the waveshaper transfer curve
pub const DRIVE_CURVE_POINTS: usize = 44100;

/// Soft-clip transfer curve generated from a drive amount.
/// Cloning shares the table; regenerating is the only costly operation.
#[derive(Clone, Debug)]
pub struct DriveCurve {
    amount: f32,
    table: Arc<[f32]>,
}

impl DriveCurve {
    /// curve(x) = (3 + k) * x * 20deg / (pi + k * |x|), k = 100 * amount
    pub fn new(amount: f32) -> Self {
        let k = amount.max(0.0001) as f64 * 100.0;
        let n = DRIVE_CURVE_POINTS;
        let deg = std::f64::consts::PI / 180.0;
        let table: Vec<f32> = (0..n)
            .map(|i| {
                let x = (i as f64 * 2.0) / n as f64 - 1.0;
                (((3.0 + k) * x * 20.0 * deg) / (std::f64::consts::PI + k * x.abs())) as f32
            })
            .collect();
        Self {
            amount,
            table: table.into(),
        }
    }

    pub fn amount(&self) -> f32 {
        self.amount
    }

    pub fn table(&self) -> &[f32] {
        &self.table
    }

    #[cfg(test)]
    pub(crate) fn shares_table_with(&self, other: &DriveCurve) -> bool {
        Arc::ptr_eq(&self.table, &other.table)
    }
}

/// Waveshaper reading a DriveCurve; inputs outside [-1, 1] hit the curve's end points
pub struct WaveShaper {
    curve: DriveCurve,
}

impl WaveShaper {
    pub fn new(curve: DriveCurve) -> Self {
        Self { curve }
    }

    pub fn set_curve(&mut self, curve: DriveCurve) {
        self.curve = curve;
    }

    pub fn process(&self, input: f32) -> f32 {
        let table = self.curve.table();
        let last = table.len() - 1;
        let pos = (input.clamp(-1.0, 1.0) + 1.0) * 0.5 * last as f32;
        let idx = pos as usize;
        if idx >= last {
            return table[last];
        }
        let frac = pos - idx as f32;
        table[idx] + (table[idx + 1] - table[idx]) * frac
    }
}
