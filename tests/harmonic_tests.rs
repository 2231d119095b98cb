//! Tests for the harmonic least squares engine

use is_close::is_close;
use ndarray::Array3;
use ocean_clima::errors::ClimaError;
use ocean_clima::harmonic::{
    characterize, detrend, fit, fit_grid, fit_masked, fit_raw, BasisSpec, LeastSquares, Trend,
    DAILY_PERIOD, MONTHLY_PERIOD,
};
use ocean_clima::masked::{Masked1, Masked3, MissingConvention};
use std::f64::consts::{FRAC_PI_2, PI};

fn cosine_series(n: usize, mean: f64, amplitude: f64, phase: f64) -> Vec<Option<f64>> {
    (1..=n)
        .map(|t| Some(mean + amplitude * (2.0 * PI * t as f64 / MONTHLY_PERIOD - phase).cos()))
        .collect()
}

#[test]
fn test_mean_only_fit_of_constant_series() {
    let series = vec![Some(3.5); 10];
    let result = fit(&series, BasisSpec::Mean, MONTHLY_PERIOD).unwrap();

    assert_eq!(result.coefficients.len(), 1);
    assert!(is_close!(result.coefficients[0], 3.5));
    assert!(result.fitted.iter().all(|&f| is_close!(f, 3.5)));
}

#[test]
fn test_linear_fit_recovers_line() {
    let series: Vec<Option<f64>> = (1..=20).map(|t| Some(1.0 + 0.5 * t as f64)).collect();
    let result = fit(&series, BasisSpec::MeanLinear, MONTHLY_PERIOD).unwrap();
    assert!(is_close!(result.coefficients[0], 1.0, rel_tol = 1e-9, abs_tol = 1e-9));
    assert!(is_close!(result.coefficients[1], 0.5, rel_tol = 1e-9, abs_tol = 1e-9));
}

#[test]
fn test_annual_fit_recovers_amplitude_and_phase() {
    let series = cosine_series(36, 2.0, 0.75, 0.6);
    let result = fit(&series, BasisSpec::MeanAnnual, MONTHLY_PERIOD).unwrap();
    let stats = characterize(&series, &result).unwrap();

    let annual = stats.annual.unwrap();
    assert!((annual.amplitude - 0.75).abs() < 1e-6);
    assert!((annual.phase - 0.6).abs() < 1e-6);
    assert!((result.coefficients[0] - 2.0).abs() < 1e-6);
    assert!(stats.semiannual.is_none());
    assert!(stats.rms < 1e-9);
    assert!((stats.cod.unwrap() - 1.0).abs() < 1e-9);
}

#[test]
fn test_sine_series_phase_convention() {
    // c + A·sin(ωt + ψ) is A·cos(ωt − (π/2 − ψ))
    let psi = 0.4;
    let series: Vec<Option<f64>> = (1..=24)
        .map(|t| Some(1.0 + 0.3 * (2.0 * PI * t as f64 / MONTHLY_PERIOD + psi).sin()))
        .collect();
    let result = fit(&series, BasisSpec::MeanAnnual, MONTHLY_PERIOD).unwrap();
    let stats = characterize(&series, &result).unwrap();

    let annual = stats.annual.unwrap();
    assert!((annual.amplitude - 0.3).abs() < 1e-6);
    assert!((annual.phase - (FRAC_PI_2 - psi)).abs() < 1e-6);
}

#[test]
fn test_full_model_separates_semiannual_term() {
    let series: Vec<Option<f64>> = (1..=48)
        .map(|t| {
            let t = t as f64;
            let w = 2.0 * PI * t / MONTHLY_PERIOD;
            Some(5.0 + 0.01 * t + 0.8 * (w - 1.0).cos() + 0.2 * (2.0 * w - 0.5).cos())
        })
        .collect();
    let result = fit(&series, BasisSpec::MeanLinearAnnualSemiannual, MONTHLY_PERIOD).unwrap();
    let stats = characterize(&series, &result).unwrap();

    assert!((result.coefficients[1] - 0.01).abs() < 1e-6);
    let annual = stats.annual.unwrap();
    let semiannual = stats.semiannual.unwrap();
    assert!((annual.amplitude - 0.8).abs() < 1e-6);
    assert!((annual.phase - 1.0).abs() < 1e-6);
    assert!((semiannual.amplitude - 0.2).abs() < 1e-6);
    assert!((semiannual.phase - 0.5).abs() < 1e-6);
}

#[test]
fn test_single_sample_full_model_is_singular() {
    let err = fit(&[Some(1.0)], BasisSpec::MeanLinearAnnualSemiannual, MONTHLY_PERIOD).unwrap_err();
    assert!(matches!(
        err,
        ClimaError::DesignMatrixSingular {
            parameters: 6,
            observations: 1
        }
    ));
    assert!(!err.is_missing_data());
}

#[test]
fn test_aliased_period_is_singular() {
    // With a period of two samples sin(πt) vanishes at every integer t
    let series = vec![Some(1.0); 12];
    let err = fit(&series, BasisSpec::MeanAnnual, 2.0).unwrap_err();
    assert!(matches!(err, ClimaError::DesignMatrixSingular { .. }));
}

#[test]
fn test_gaps_are_filled_with_series_mean() {
    let series = vec![Some(1.0), None, Some(3.0), None, Some(5.0)];
    let result = fit(&series, BasisSpec::Mean, MONTHLY_PERIOD).unwrap();
    assert!(is_close!(result.fill_value, 3.0));
    assert!(is_close!(result.coefficients[0], 3.0));

    let masked = fit_masked(&Masked1::from_options(&series), BasisSpec::Mean, MONTHLY_PERIOD).unwrap();
    assert_eq!(masked, result);

    let raw = fit_raw(
        &[1.0, 99.0, 3.0, 99.0, 5.0],
        Some(&[false, true, false, true, false]),
        MissingConvention::Mask,
        BasisSpec::Mean,
        MONTHLY_PERIOD,
    )
    .unwrap();
    assert_eq!(raw, result);
}

#[test]
fn test_all_missing_series_is_missing_data() {
    let err = fit(&[None, None, None], BasisSpec::Mean, MONTHLY_PERIOD).unwrap_err();
    assert!(err.is_missing_data());
}

#[test]
fn test_configuration_errors_precede_computation() {
    let series = vec![Some(1.0); 24];
    let err = fit(&series, BasisSpec::MeanAnnual, 0.0).unwrap_err();
    assert!(matches!(err, ClimaError::InvalidConfiguration { ref parameter, .. } if parameter == "period"));

    // A period is irrelevant without periodic terms
    assert!(fit(&series, BasisSpec::Mean, 0.0).is_ok());

    assert!(BasisSpec::from_trend(Trend::Sinusoidal, 7).is_err());
    assert_eq!(
        BasisSpec::from_trend(Trend::Exponential, 2).unwrap(),
        BasisSpec::Exponential
    );
    assert!("quadratic".parse::<BasisSpec>().is_err());
}

#[test]
fn test_solver_is_reusable_and_checks_length() {
    let solver = LeastSquares::new(BasisSpec::MeanAnnual, 730, DAILY_PERIOD).unwrap();
    assert_eq!(solver.len(), 730);

    let series: Vec<Option<f64>> = (1..=730)
        .map(|t| Some(10.0 + (2.0 * PI * t as f64 / DAILY_PERIOD).sin()))
        .collect();
    let result = solver.fit(&series).unwrap();
    assert!((result.coefficients[1] - 1.0).abs() < 1e-6);
    assert!(result.coefficients[2].abs() < 1e-6);

    let err = solver.fit(&series[..100]).unwrap_err();
    assert!(matches!(err, ClimaError::ShapeMismatch { .. }));
}

#[test]
fn test_grid_fit_matches_single_series_fit() {
    let n = 36;
    let values = Array3::from_shape_fn((n, 1, 2), |(t, _, j)| {
        if j == 1 {
            f64::NAN
        } else {
            3.0 + (2.0 * PI * (t + 1) as f64 / MONTHLY_PERIOD - 0.2).cos()
        }
    });
    let data = Masked3::from_nan(values);
    let grid = fit_grid(&data, BasisSpec::MeanAnnual, MONTHLY_PERIOD).unwrap();
    assert_eq!(grid.coefficients.len(), 3);

    let single = fit(&cosine_series(n, 3.0, 1.0, 0.2), BasisSpec::MeanAnnual, MONTHLY_PERIOD).unwrap();
    for (k, expected) in single.coefficients.iter().enumerate() {
        let got = grid.coefficient(k).unwrap().get([0, 0]).unwrap();
        assert!((got - expected).abs() < 1e-12);
        assert_eq!(grid.coefficient(k).unwrap().get([0, 1]), None);
    }

    assert!(fit_grid(&data, BasisSpec::MeanLinearAnnualSemiannual, MONTHLY_PERIOD).is_ok());
    let short = Masked3::from_nan(Array3::zeros((2, 1, 1)));
    assert!(matches!(
        fit_grid(&short, BasisSpec::MeanAnnual, MONTHLY_PERIOD),
        Err(ClimaError::DesignMatrixSingular { .. })
    ));
}

#[test]
fn test_characterize_residual_keeps_gaps() {
    let mut series = cosine_series(24, 1.0, 0.5, 0.0);
    series[3] = None;
    let result = fit(&series, BasisSpec::MeanAnnual, MONTHLY_PERIOD).unwrap();
    let stats = characterize(&series, &result).unwrap();
    assert_eq!(stats.residual.len(), 24);
    assert!(stats.residual[3].is_none());
    assert!(stats.residual.iter().flatten().count() == 23);

    let err = characterize(&series[..10], &result).unwrap_err();
    assert!(matches!(err, ClimaError::ShapeMismatch { .. }));
}

#[test]
fn test_detrend_removes_slope_and_keeps_level() {
    let series: Vec<Option<f64>> = (1..=24).map(|t| Some(5.0 + 0.2 * t as f64)).collect();
    let detrended = detrend(&Masked1::from_options(&series)).unwrap();
    for (i, value) in detrended.to_options().into_iter().enumerate() {
        let v = value.unwrap();
        assert!((v - 5.0).abs() < 1e-9, "index {i}: {v}");
    }

    let mut gappy = series;
    gappy[4] = None;
    let detrended = detrend(&Masked1::from_options(&gappy)).unwrap();
    assert_eq!(detrended.get(4), None);
    assert_eq!(detrended.count_valid(), 23);
}

#[test]
fn test_non_finite_samples_are_treated_as_missing() {
    let series = [Some(1.0), Some(f64::NAN), Some(3.0)];
    let result = fit(&series, BasisSpec::Mean, MONTHLY_PERIOD).unwrap();
    assert_eq!(result.coefficients, vec![2.0]);
    assert_eq!(result.fill_value, 2.0);
    assert!(result.fitted.iter().all(|&f| f == 2.0));

    let stats = characterize(&series, &result).unwrap();
    assert!(stats.residual[1].is_none());
    assert!(stats.rms.is_finite());

    let err = fit(&[Some(f64::NAN), Some(f64::INFINITY)], BasisSpec::Mean, MONTHLY_PERIOD).unwrap_err();
    assert!(err.is_missing_data());
}

#[test]
fn test_grid_fit_leaves_unusable_cells_missing() {
    // Flagged valid but holding NaN: such a cell has no usable sample
    let values = Array3::from_shape_fn((4, 1, 2), |(t, _, j)| if j == 1 { f64::NAN } else { t as f64 });
    let valid = Array3::from_elem((4, 1, 2), true);
    let data = Masked3::new(values, valid).unwrap();

    let grid = fit_grid(&data, BasisSpec::Mean, MONTHLY_PERIOD).unwrap();
    assert_eq!(grid.coefficient(0).unwrap().get([0, 0]), Some(1.5));
    assert_eq!(grid.coefficient(0).unwrap().get([0, 1]), None);
}
