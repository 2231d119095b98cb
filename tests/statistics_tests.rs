//! Tests for grouped temporal moments, monthly averages and climatologies

use chrono::{NaiveDate, NaiveDateTime};
use is_close::is_close;
use ndarray::Array3;
use ocean_clima::errors::ClimaError;
use ocean_clima::masked::{Masked3, MissingConvention};
use ocean_clima::series::TimeSeries3D;
use ocean_clima::statistics::{
    climatology, monthly_average, reduce, require_observations, time_mean, Grouping,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// One step on the 15th of every month for `years` years starting 1993
fn monthly_axis(years: i32) -> Vec<NaiveDateTime> {
    (0..years)
        .flat_map(|y| (1..=12).map(move |m| date(1993 + y, m, 15)))
        .collect()
}

#[test]
fn test_nan_and_mask_conventions_give_identical_moments() {
    let time = monthly_axis(1);
    let base = Array3::from_shape_fn((12, 2, 2), |(t, i, j)| {
        ((t * 7 + i * 3 + j) % 11) as f64 * 0.37 + (t as f64).sqrt()
    });
    let missing = [(1, 0, 0), (4, 0, 0), (9, 1, 1), (3, 0, 1)];

    let mut with_nan = base.clone();
    let mut with_fill = base.clone();
    let mut mask = Array3::from_elem((12, 2, 2), false);
    for &(t, i, j) in &missing {
        with_nan[[t, i, j]] = f64::NAN;
        with_fill[[t, i, j]] = -999.0;
        mask[[t, i, j]] = true;
    }

    let nan_series = TimeSeries3D::from_raw(time.clone(), with_nan, None, MissingConvention::Nan).unwrap();
    let mask_series =
        TimeSeries3D::from_raw(time, with_fill, Some(&mask), MissingConvention::Mask).unwrap();

    for grouping in [Grouping::All, Grouping::Seasonal, Grouping::Monthly] {
        let a = reduce(&nan_series, grouping);
        let b = reduce(&mask_series, grouping);
        for (ga, gb) in a.groups.iter().zip(&b.groups) {
            assert_eq!(ga.count, gb.count);
            assert_eq!(ga.mean, gb.mean);
            assert_eq!(ga.median, gb.median);
            assert_eq!(ga.variance, gb.variance);
            assert_eq!(ga.skewness, gb.skewness);
            assert_eq!(ga.kurtosis, gb.kurtosis);
        }
    }
}

#[test]
fn test_convention_requires_matching_mask() {
    let values = Array3::zeros((1, 1, 1));
    let mask = Array3::from_elem((1, 1, 1), false);
    let err = Masked3::from_convention(values.clone(), Some(&mask), MissingConvention::Nan).unwrap_err();
    assert!(matches!(err, ClimaError::InvalidConfiguration { .. }));
    let err = Masked3::from_convention(values, None, MissingConvention::Mask).unwrap_err();
    assert!(matches!(err, ClimaError::InvalidConfiguration { .. }));
}

#[test]
fn test_monthly_groups_collect_each_calendar_month() {
    let time = monthly_axis(2);
    let values = Array3::from_shape_fn((24, 1, 2), |(t, _, j)| {
        if j == 1 && t % 12 == 0 {
            f64::NAN // January never observed in the second cell
        } else {
            (t / 12) as f64 + 1.0
        }
    });
    let series = TimeSeries3D::new(time, Masked3::from_nan(values)).unwrap();
    let aggregate = reduce(&series, Grouping::Monthly);

    assert_eq!(aggregate.groups.len(), 12);
    let january = aggregate.get(1).unwrap();
    assert_eq!(january.steps, 2);
    assert_eq!(january.count[[0, 0]], 2);
    assert_eq!(january.mean.get([0, 0]), Some(1.5));
    assert_eq!(january.median.get([0, 0]), Some(1.5));
    assert_eq!(january.variance.get([0, 0]), Some(0.25));

    // A cell without samples is missing for every statistic
    assert_eq!(january.count[[0, 1]], 0);
    assert_eq!(january.mean.get([0, 1]), None);
    assert_eq!(january.variance.get([0, 1]), None);
    assert_eq!(january.skewness.get([0, 1]), None);
    assert_eq!(january.kurtosis.get([0, 1]), None);
    assert!(require_observations(january).is_ok());

    let stacked = aggregate.stack(|g| &g.mean).unwrap();
    assert_eq!(stacked.shape(), &[12, 1, 2]);
    assert_eq!(aggregate.count_stack().unwrap()[[0, 0, 1]], 0);
}

#[test]
fn test_seasonal_and_whole_record_moments() {
    let time = monthly_axis(1);
    let values = Array3::from_shape_fn((12, 1, 1), |(t, _, _)| t as f64);
    let series = TimeSeries3D::new(time, Masked3::from_nan(values)).unwrap();

    let seasonal = reduce(&series, Grouping::Seasonal);
    assert_eq!(seasonal.groups.len(), 4);
    // DJF = Dec, Jan, Feb -> 11, 0, 1
    let djf = seasonal.get(0).unwrap();
    assert_eq!(djf.count[[0, 0]], 3);
    assert!(is_close!(djf.mean.get([0, 0]).unwrap(), 4.0));
    assert_eq!(djf.median.get([0, 0]), Some(1.0));

    let all = reduce(&series, Grouping::All);
    let g = &all.groups[0];
    assert_eq!(g.count[[0, 0]], 12);
    assert!(is_close!(g.mean.get([0, 0]).unwrap(), 5.5));
    // Population variance of 0..=11
    assert!(is_close!(g.variance.get([0, 0]).unwrap(), 143.0 / 12.0));
    assert!(g.skewness.get([0, 0]).unwrap().abs() < 1e-9);
    // Excess kurtosis of a discrete uniform on 12 points
    let expected_kurtosis = -6.0 * (144.0 + 1.0) / (5.0 * (144.0 - 1.0));
    assert!((g.kurtosis.get([0, 0]).unwrap() - expected_kurtosis).abs() < 1e-9);
}

#[test]
fn test_group_without_any_sample_is_reported() {
    let time = vec![date(1993, 1, 1), date(1993, 1, 2)];
    let series = TimeSeries3D::new(time, Masked3::from_nan(Array3::from_elem((2, 1, 1), 1.0))).unwrap();
    let aggregate = reduce(&series, Grouping::Monthly);
    let july = aggregate.get(7).unwrap();
    assert_eq!(july.steps, 0);
    let err = require_observations(july).unwrap_err();
    assert!(err.is_missing_data());
}

#[test]
fn test_monthly_average_skips_absent_months() {
    let mut time: Vec<NaiveDateTime> = (1..=4).map(|d| date(1993, 1, d)).collect();
    time.extend((1..=2).map(|d| date(1993, 3, d)));
    let values = Array3::from_shape_vec((6, 1, 1), vec![1.0, 2.0, 3.0, f64::NAN, 10.0, 20.0]).unwrap();
    let series = TimeSeries3D::new(time, Masked3::from_nan(values)).unwrap();

    let months = monthly_average(&series);
    assert_eq!(months.len(), 2);

    let january = &months[0];
    assert_eq!((january.year, january.month), (1993, 1));
    assert_eq!(january.count[[0, 0]], 3);
    assert_eq!(january.mean.get([0, 0]), Some(2.0));
    assert_eq!(january.median.get([0, 0]), Some(2.0));
    assert!(is_close!(january.std.get([0, 0]).unwrap(), (2.0_f64 / 3.0).sqrt()));
    // Four daily steps: mean offset of 1.5 days from the first
    assert_eq!(january.time, date(1993, 1, 2) + chrono::Duration::hours(12));

    let march = &months[1];
    assert_eq!(march.month, 3);
    assert_eq!(march.mean.get([0, 0]), Some(15.0));
}

#[test]
fn test_time_mean_and_climatology() {
    let time = monthly_axis(2);
    let values = Array3::from_shape_fn((24, 1, 2), |(t, _, j)| if j == 1 { f64::NAN } else { t as f64 });
    let series = TimeSeries3D::new(time, Masked3::from_nan(values)).unwrap();

    let mean = time_mean(series.data());
    assert_eq!(mean.get([0, 0]), Some(11.5));
    assert_eq!(mean.get([0, 1]), None);

    let clima = climatology(&series);
    assert_eq!(clima.grouping, Grouping::Monthly);
    assert_eq!(clima.get(3).unwrap().mean.get([0, 0]), Some(8.0));
}

#[test]
fn test_time_axis_must_increase() {
    let time = vec![date(1993, 1, 2), date(1993, 1, 1)];
    let err = TimeSeries3D::new(time, Masked3::from_nan(Array3::zeros((2, 1, 1)))).unwrap_err();
    assert!(matches!(err, ClimaError::TimeAxis(_)));

    let err = TimeSeries3D::new(vec![date(1993, 1, 1)], Masked3::from_nan(Array3::zeros((2, 1, 1)))).unwrap_err();
    assert!(matches!(err, ClimaError::ShapeMismatch { .. }));
}
