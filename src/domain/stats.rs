//! Window statistics used by strategies and performance reporting.
//!
//! All functions return `None` when the input is too short or degenerate
//! rather than producing NaN.

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divisor n).
pub fn population_stddev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Least-squares slope of `y` on `x` without an intercept: Σxy / Σx².
pub fn ols_slope_through_origin(y: &[f64], x: &[f64]) -> Option<f64> {
    if y.len() != x.len() || x.is_empty() {
        return None;
    }
    let sxx: f64 = x.iter().map(|v| v * v).sum();
    if sxx == 0.0 {
        return None;
    }
    let sxy: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();
    Some(sxy / sxx)
}

/// Z-score of the last element against the whole window (population stddev).
pub fn zscore_last(values: &[f64]) -> Option<f64> {
    let last = *values.last()?;
    let m = mean(values)?;
    let sd = population_stddev(values)?;
    if sd == 0.0 {
        return None;
    }
    Some((last - m) / sd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mean_of_values() {
        assert_relative_eq!(mean(&[1.0, 2.0, 3.0, 4.0]).unwrap(), 2.5);
        assert!(mean(&[]).is_none());
    }

    #[test]
    fn population_stddev_divides_by_n() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(population_stddev(&values).unwrap(), 2.0);
        assert_relative_eq!(population_stddev(&[3.0]).unwrap(), 0.0);
        assert!(population_stddev(&[]).is_none());
    }

    #[test]
    fn ols_slope_recovers_exact_ratio() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y: Vec<f64> = x.iter().map(|v| 1.5 * v).collect();
        assert_relative_eq!(ols_slope_through_origin(&y, &x).unwrap(), 1.5, epsilon = 1e-12);
    }

    #[test]
    fn ols_slope_rejects_degenerate_input() {
        assert!(ols_slope_through_origin(&[1.0, 2.0], &[0.0, 0.0]).is_none());
        assert!(ols_slope_through_origin(&[1.0], &[1.0, 2.0]).is_none());
        assert!(ols_slope_through_origin(&[], &[]).is_none());
    }

    #[test]
    fn zscore_of_last_value() {
        // mean 2, population sd sqrt(2/3)
        assert_relative_eq!(
            zscore_last(&[1.0, 2.0, 3.0]).unwrap(),
            1.5_f64.sqrt(),
            epsilon = 1e-12
        );
        assert!(zscore_last(&[5.0, 5.0, 5.0]).is_none());
    }

    #[test]
    fn zscore_of_single_spike_is_three() {
        // mean 0.1, population sd 0.3
        let mut window = vec![0.0; 9];
        window.push(1.0);
        assert_relative_eq!(zscore_last(&window).unwrap(), 3.0, epsilon = 1e-12);
    }
}
