//! Pure descriptive statistics over month-ordered series.

use bizdiag_model::MonthKey;

/// Means closer to zero than this make relative measures meaningless.
pub const MEAN_EPSILON: f64 = 1e-9;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let variance =
        values.iter().map(|value| (value - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Linear-interpolated quantile, `q` in [0, 1].
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sorted = sorted(values);
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Coefficient of variation; `None` when the mean is too close to zero.
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    if mean.abs() <= MEAN_EPSILON {
        return None;
    }
    Some(std_dev(values)? / mean.abs())
}

/// Ordinary least squares fit of `ys` on `xs`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

pub fn linear_fit(xs: &[f64], ys: &[f64]) -> Option<LinearFit> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let x_mean = mean(xs)?;
    let y_mean = mean(ys)?;
    let mut covariance = 0.0;
    let mut variance = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        covariance += (x - x_mean) * (y - y_mean);
        variance += (x - x_mean).powi(2);
    }
    if variance == 0.0 {
        return None;
    }
    let slope = covariance / variance;
    Some(LinearFit {
        slope,
        intercept: y_mean - slope * x_mean,
    })
}

/// Trend of a series against calendar months elapsed since its first month.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trend {
    /// Change per month.
    pub slope: f64,
    /// Fitted change over the observed window as a percentage of the mean.
    pub window_pct: Option<f64>,
}

pub fn trend(series: &[(MonthKey, f64)]) -> Option<Trend> {
    let (first, _) = *series.first()?;
    let (last, _) = *series.last()?;
    let xs: Vec<f64> = series
        .iter()
        .map(|(month, _)| month.months_since(first) as f64)
        .collect();
    let ys: Vec<f64> = series.iter().map(|(_, value)| *value).collect();
    let fit = linear_fit(&xs, &ys)?;
    let span = last.months_since(first) as f64;
    let window_pct = mean(&ys)
        .filter(|mean| mean.abs() > MEAN_EPSILON)
        .map(|mean| fit.slope * span / mean.abs() * 100.0);
    Some(Trend {
        slope: fit.slope,
        window_pct,
    })
}

/// Points further than `sigma` population standard deviations from the mean.
pub fn outliers(series: &[(MonthKey, f64)], sigma: f64) -> Vec<(MonthKey, f64)> {
    let values: Vec<f64> = series.iter().map(|(_, value)| *value).collect();
    let (Some(mean), Some(std)) = (mean(&values), std_dev(&values)) else {
        return Vec::new();
    };
    if std <= MEAN_EPSILON {
        return Vec::new();
    }
    series
        .iter()
        .filter(|(_, value)| (value - mean).abs() > sigma * std)
        .copied()
        .collect()
}

/// Percentage changes between calendar-adjacent months with a non-zero base.
pub fn month_over_month(series: &[(MonthKey, f64)]) -> Vec<(MonthKey, f64)> {
    series
        .windows(2)
        .filter_map(|pair| {
            let (previous_month, previous) = pair[0];
            let (month, value) = pair[1];
            (month.months_since(previous_month) == 1 && previous.abs() > MEAN_EPSILON)
                .then(|| (month, (value - previous) / previous.abs() * 100.0))
        })
        .collect()
}

/// First-to-last growth of a series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Growth {
    pub total_pct: f64,
    /// Compound monthly growth rate.
    pub cmgr_pct: f64,
}

pub fn growth(series: &[(MonthKey, f64)]) -> Option<Growth> {
    if series.len() < 2 {
        return None;
    }
    let (first_month, first) = *series.first()?;
    let (last_month, last) = *series.last()?;
    let periods = last_month.months_since(first_month);
    if first <= 0.0 || last < 0.0 || periods <= 0 {
        return None;
    }
    let ratio = last / first;
    Some(Growth {
        total_pct: (ratio - 1.0) * 100.0,
        cmgr_pct: (ratio.powf(1.0 / periods as f64) - 1.0) * 100.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> Vec<(MonthKey, f64)> {
        let mut month = MonthKey::new(2024, 1).unwrap();
        values
            .iter()
            .map(|value| {
                let point = (month, *value);
                month = month.next();
                point
            })
            .collect()
    }

    #[test]
    fn basic_moments() {
        let values = [100.0, 100.0, 100.0, 400.0];
        assert!((mean(&values).unwrap() - 175.0).abs() < 1e-9);
        assert!((std_dev(&values).unwrap() - 16875f64.sqrt()).abs() < 1e-9);
        assert!((median(&values).unwrap() - 100.0).abs() < 1e-9);
        assert!((coefficient_of_variation(&values).unwrap() - 16875f64.sqrt() / 175.0).abs() < 1e-9);
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn quantiles_interpolate() {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert!((quantile(&values, 0.25).unwrap() - 1.75).abs() < 1e-9);
        assert!((quantile(&values, 0.75).unwrap() - 3.25).abs() < 1e-9);
        assert!((median(&values).unwrap() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn cv_needs_a_nonzero_mean() {
        assert_eq!(coefficient_of_variation(&[-1.0, 1.0]), None);
    }

    #[test]
    fn trend_uses_calendar_months() {
        let mut points = series(&[100.0, 110.0]);
        // a gap month: 2024-04 instead of 2024-03
        points.push((MonthKey::new(2024, 4).unwrap(), 130.0));
        let trend = trend(&points).unwrap();
        assert!((trend.slope - 10.0).abs() < 1e-9);
        let expected_pct = 10.0 * 3.0 / (340.0 / 3.0) * 100.0;
        assert!((trend.window_pct.unwrap() - expected_pct).abs() < 1e-9);
        assert_eq!(super::trend(&series(&[5.0])), None);
    }

    #[test]
    fn spike_is_flagged_only_past_the_threshold() {
        let points = series(&[100.0, 100.0, 100.0, 400.0]);
        assert!(outliers(&points, 2.0).is_empty());
        let flagged = outliers(&points, 1.5);
        assert_eq!(flagged, vec![(MonthKey::new(2024, 4).unwrap(), 400.0)]);
        assert!(outliers(&series(&[5.0, 5.0, 5.0]), 1.0).is_empty());
    }

    #[test]
    fn month_over_month_skips_gaps_and_zero_bases() {
        let points = vec![
            (MonthKey::new(2024, 1).unwrap(), 100.0),
            (MonthKey::new(2024, 2).unwrap(), 150.0),
            (MonthKey::new(2024, 3).unwrap(), 0.0),
            (MonthKey::new(2024, 4).unwrap(), 50.0),
            (MonthKey::new(2024, 6).unwrap(), 60.0),
        ];
        let changes = month_over_month(&points);
        assert_eq!(changes.len(), 2);
        assert!((changes[0].1 - 50.0).abs() < 1e-9);
        assert!((changes[1].1 + 100.0).abs() < 1e-9);
    }

    #[test]
    fn compound_growth() {
        let growth = growth(&series(&[100.0, 110.0, 121.0])).unwrap();
        assert!((growth.total_pct - 21.0).abs() < 1e-9);
        assert!((growth.cmgr_pct - 10.0).abs() < 1e-9);
        assert_eq!(super::growth(&series(&[0.0, 10.0])), None);
    }
}
