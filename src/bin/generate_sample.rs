//! Writes `sample_metrics.csv` and `sample_icontrol.csv` for trying the
//! viewer without real recordings.

use anyhow::{Context, Result};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Event tracking metrics: one row every 0.1 h over 48 h.
fn write_metrics(path: &str, rng: &mut SimpleRng) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    writer.write_record(["Time", "EventRate", "MeanAmplitude", "Duration"])?;

    let mut rows = 0;
    for i in 0..480 {
        let t = i as f64 * 0.1;
        // Activity ramps up after 12 h and settles around 36 h.
        let activity = 1.0 / (1.0 + (-(t - 12.0)).exp()) - 0.5 / (1.0 + (-(t - 36.0)).exp());
        let rate = 5.0 + 20.0 * activity + rng.gauss(0.0, 1.5);
        let amplitude = 0.8 + 0.4 * activity + rng.gauss(0.0, 0.05);
        let duration = (2.0 + rng.gauss(0.0, 0.3)).max(0.1);

        writer.write_record([
            format!("{t:.1}"),
            format!("{rate:.3}"),
            format!("{amplitude:.4}"),
            format!("{duration:.3}"),
        ])?;
        rows += 1;
    }
    writer.flush()?;
    Ok(rows)
}

/// iControl readings: every 0.5 h, with feeding steps in Volume.
fn write_icontrol(path: &str, rng: &mut SimpleRng) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    writer.write_record(["Time", "Temperature", "Volume"])?;

    let mut rows = 0;
    for i in 0..=96 {
        let t = i as f64 * 0.5;
        let temperature = 37.0 + 0.3 * (t / 6.0).sin() + rng.gauss(0.0, 0.05);
        let feeds = (t / 8.0).floor();
        let volume = 1.0 + 0.05 * feeds + rng.gauss(0.0, 0.005);

        writer.write_record([
            format!("{t:.1}"),
            format!("{temperature:.3}"),
            format!("{volume:.4}"),
        ])?;
        rows += 1;
    }
    writer.flush()?;
    Ok(rows)
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    let metrics_path = "sample_metrics.csv";
    let icontrol_path = "sample_icontrol.csv";
    let metrics_rows = write_metrics(metrics_path, &mut rng)?;
    let icontrol_rows = write_icontrol(icontrol_path, &mut rng)?;

    println!("Wrote {metrics_rows} rows to {metrics_path} and {icontrol_rows} rows to {icontrol_path}");
    Ok(())
}
