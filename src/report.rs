use std::io::{self, Write};

/// Mean of the last `window` scores (fewer if the history is shorter).
pub fn rolling_mean(scores: &[u32], window: usize) -> f32 {
    let tail = &scores[scores.len().saturating_sub(window)..];
    if tail.is_empty() {
        return 0.0;
    }
    tail.iter().map(|&s| s as f32).sum::<f32>() / tail.len() as f32
}

/// Consumer of the finished score curve.
pub trait ScoreSink {
    fn plot(&mut self, scores: &[u32]) -> io::Result<()>;
}

/// Terminal line chart: episodes bucketed into columns, each column the bucket mean.
pub struct AsciiPlot<W: Write> {
    out: W,
    pub width: usize,
    pub height: usize,
}

impl<W: Write> AsciiPlot<W> {
    pub fn new(out: W, width: usize, height: usize) -> Self {
        Self { out, width: width.max(1), height: height.max(1) }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn columns(&self, scores: &[u32]) -> Vec<f32> {
        let cols = self.width.min(scores.len());
        (0..cols)
            .map(|c| {
                let lo = c * scores.len() / cols;
                let hi = ((c + 1) * scores.len() / cols).max(lo + 1);
                let bucket = &scores[lo..hi];
                bucket.iter().map(|&s| s as f32).sum::<f32>() / bucket.len() as f32
            })
            .collect()
    }
}

impl<W: Write> ScoreSink for AsciiPlot<W> {
    fn plot(&mut self, scores: &[u32]) -> io::Result<()> {
        if scores.is_empty() {
            return writeln!(self.out, "(no episodes)");
        }
        let cols = self.columns(scores);
        let top = cols.iter().copied().fold(0.0f32, f32::max).max(1.0);
        let label_w = format!("{top:.1}").len();

        for row in (0..self.height).rev() {
            let level = top * row as f32 / self.height as f32;
            let label = if row + 1 == self.height {
                format!("{top:.1}")
            } else if row == 0 {
                "0".to_string()
            } else {
                String::new()
            };
            let line: String = cols.iter().map(|&v| if v > level { '*' } else { ' ' }).collect();
            writeln!(self.out, "{label:>label_w$} |{}", line.trim_end())?;
        }
        writeln!(self.out, "{} +{}", " ".repeat(label_w), "-".repeat(cols.len()))?;
        writeln!(
            self.out,
            "{} episode 1..{} ({} per column)",
            " ".repeat(label_w),
            scores.len(),
            scores.len().div_ceil(cols.len())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolling_mean_uses_available_history() {
        assert_eq!(rolling_mean(&[], 100), 0.0);
        assert_eq!(rolling_mean(&[2, 4], 100), 3.0);
        assert_eq!(rolling_mean(&[100, 1, 2, 3], 3), 2.0);
    }

    #[test]
    fn plot_scales_to_the_best_bucket() {
        let mut plot = AsciiPlot::new(Vec::new(), 4, 4);
        plot.plot(&[0, 0, 2, 2, 4, 4, 8, 8]).unwrap();
        let text = String::from_utf8(plot.into_inner()).unwrap();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), 6);
        assert!(rows[0].starts_with("8.0 |"));
        assert!(rows[0].ends_with('*'));
        assert!(rows[3].starts_with("  0 |"));
        assert_eq!(rows[3].matches('*').count(), 3);
        assert!(rows[5].contains("episode 1..8"));
    }

    #[test]
    fn empty_history_plots_placeholder() {
        let mut plot = AsciiPlot::new(Vec::new(), 10, 3);
        plot.plot(&[]).unwrap();
        assert_eq!(String::from_utf8(plot.into_inner()).unwrap(), "(no episodes)\n");
    }
}
