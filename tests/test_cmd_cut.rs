use approx::assert_relative_eq;
use camino::Utf8PathBuf;
use cmdcut::{
    catalog::{Catalog, FilterSet},
    cmd_cut::{color_cut, magnitude_cut, CmdCutParams, RidgeInput},
    cmd_errors::CmdError,
    error_model::CatalogErrorModel,
    extinction::{ExtinctionParams, ExtinctionTable, ExtinctionVector, ShearMode},
    fitting::exponential::LevMarParams,
    isochrone::{IsochroneProjection, IsochroneQuery, IsochroneTrack},
    partition::export::{export_partition, write_members},
    ridge_line::RidgeFitParams,
};

mod common;
use common::{assert_no_star_in_two_bins, init_logger, load_catalog, load_grid};

fn giant_branch() -> IsochroneTrack {
    let query = IsochroneQuery::new(10.0).with_metallicity(0.02).with_labels(3, 3);
    load_grid()
        .select(
            &query,
            &FilterSet::new("f115w", "f150w"),
            &IsochroneProjection::unreddened(29.0),
        )
        .unwrap()
        .remove(0)
}

/// Stars within `tol` of colour = 0.2 · mag - 4.3.
fn near_branch(catalog: &Catalog, tol: f64) -> Vec<&cmdcut::catalog::StarRecord> {
    catalog
        .iter()
        .filter(|s| (s.color - (0.2 * s.magnitude - 4.3)).abs() < tol)
        .collect()
}

#[test]
fn test_magnitude_cut_on_isochrone() {
    init_logger();
    let catalog = load_catalog();
    let track = giant_branch();
    let table = ExtinctionTable::jwst_hst();
    let params = CmdCutParams::default();

    let cut = magnitude_cut(&catalog, RidgeInput::Isochrone(&track), &table, &params).unwrap();
    assert_eq!(cut.n_bins(), 8);
    assert_relative_eq!(cut.ridge.slope, 0.2, epsilon = 1e-6);
    assert_relative_eq!(cut.ridge.intercept, -4.3, epsilon = 1e-4);

    let vector = ExtinctionVector::build(&table, &ExtinctionParams::default()).unwrap();
    assert_eq!(cut.extinction, Some(vector));
    assert_relative_eq!(cut.partition.shear, vector.slope, epsilon = 1e-12);

    assert_no_star_in_two_bins(&cut.partition, &catalog);

    // the across-track window follows the ridge-line from bin to bin
    for bin in cut.partition.iter() {
        let (lo, hi) = bin.window.unwrap();
        let ridge_color = cut.ridge.eval(bin.center);
        assert_relative_eq!(lo, ridge_color - 0.5, epsilon = 1e-12);
        assert_relative_eq!(hi, ridge_color + 0.5, epsilon = 1e-12);
        assert!(bin.members.iter().all(|s| s.color >= lo && s.color <= hi));
    }
    assert_relative_eq!(
        cut.partition.bins()[7].window.unwrap().0 - cut.partition.bins()[0].window.unwrap().0,
        0.2 * 3.5,
        epsilon = 1e-4
    );

    for star in near_branch(&catalog, 0.1)
        .into_iter()
        .filter(|s| s.magnitude > 22.5 && s.magnitude < 25.5)
    {
        assert!(cut.partition.bin_of(star).is_some(), "{star:?} not assigned");
    }
    assert!(cut.partition.n_members() > 300);
    assert!(cut.partition.n_members() < catalog.len());
}

#[test]
fn test_magnitude_cut_empirical() {
    init_logger();
    let catalog = load_catalog();
    let ridge = RidgeFitParams::builder()
        .color_window(0.0, 1.2)
        .magnitude_window(21.5, 26.5)
        .build()
        .unwrap();
    let params = CmdCutParams::builder()
        .ridge(ridge)
        .shear(ShearMode::PerpendicularToRidge)
        .range(22.0, 26.0)
        .step(0.25)
        .build()
        .unwrap();

    let cut = magnitude_cut(
        &catalog,
        RidgeInput::Empirical,
        &ExtinctionTable::jwst_hst(),
        &params,
    )
    .unwrap();
    assert_eq!(cut.n_bins(), 16);
    assert_relative_eq!(cut.ridge.slope, 0.2, epsilon = 0.02);
    assert_relative_eq!(cut.partition.shear, -cut.ridge.slope, epsilon = 1e-12);
    assert_no_star_in_two_bins(&cut.partition, &catalog);
}

#[test]
fn test_color_cut_along_branch() {
    init_logger();
    let catalog = load_catalog();
    let track = giant_branch();
    let params = CmdCutParams {
        range: Some((0.0, 1.0)),
        step: 0.1,
        reference_magnitude: Some(24.0),
        ..CmdCutParams::color_cut_defaults()
    };

    let cut = color_cut(
        &catalog,
        RidgeInput::Isochrone(&track),
        &ExtinctionTable::jwst_hst(),
        &params,
    )
    .unwrap();
    assert_eq!(cut.n_bins(), 10);
    assert_relative_eq!(cut.ridge.slope, 5.0, epsilon = 1e-4);
    assert_relative_eq!(cut.partition.shear, 0.2, epsilon = 1e-5);
    assert_no_star_in_two_bins(&cut.partition, &catalog);

    // the strips are parallel to the branch: its stars cross the reference
    // magnitude between colours 0.4 and 0.6
    for star in near_branch(&catalog, 0.09) {
        let bin = cut.partition.bin_of(star);
        assert!(matches!(bin, Some(4) | Some(5)), "{star:?} in {bin:?}");
    }
}

#[test]
fn test_partitions_run_in_parallel() {
    init_logger();
    let catalog = load_catalog();
    let table = ExtinctionTable::jwst_hst();
    let params = CmdCutParams::default();
    let vertical = CmdCutParams {
        shear: ShearMode::Fixed(0.0),
        range: Some((0.0, 1.0)),
        ..CmdCutParams::default()
    };

    let (a, b) = std::thread::scope(|s| {
        let a = s.spawn(|| {
            magnitude_cut(&catalog, RidgeInput::Empirical, &table, &params)
                .map(|cut| cut.partition.n_members())
        });
        let b = s.spawn(|| {
            color_cut(&catalog, RidgeInput::Empirical, &table, &vertical)
                .map(|cut| cut.partition.n_members())
        });
        (a.join().unwrap(), b.join().unwrap())
    });

    let sequential = magnitude_cut(&catalog, RidgeInput::Empirical, &table, &params).unwrap();
    assert_eq!(a.unwrap(), sequential.partition.n_members());
    let expected = catalog
        .iter()
        .filter(|s| s.color > 0.0 && s.color <= 1.0)
        .count();
    assert_eq!(b.unwrap(), expected);
}

#[test]
fn test_unknown_filter_in_extinction_table() {
    init_logger();
    let catalog = load_catalog();
    let table = ExtinctionTable::new().with("f115w", 0.419);
    assert!(matches!(
        magnitude_cut(&catalog, RidgeInput::Empirical, &table, &CmdCutParams::default()),
        Err(CmdError::UnknownFilter(_))
    ));
}

#[test]
fn test_error_bars() {
    init_logger();
    let catalog = load_catalog();
    let model = CatalogErrorModel::fit(&catalog, &LevMarParams::default()).unwrap();
    assert_relative_eq!(model.magnitude.tau, 1.2, max_relative = 0.02);
    assert_relative_eq!(model.magnitude.eval(24.0), 0.01, max_relative = 0.02);

    let bars = model.default_error_bars();
    assert_eq!(bars.len(), 9);
    assert_eq!(bars[0].magnitude, 22.0);
    assert_eq!(bars[8].magnitude, 26.0);
    assert!(bars
        .windows(2)
        .all(|w| w[1].color_error > w[0].color_error && w[1].magnitude_error > w[0].magnitude_error));
}

#[test]
fn test_export() {
    init_logger();
    let catalog = load_catalog();
    let track = giant_branch();
    let cut = magnitude_cut(
        &catalog,
        RidgeInput::Isochrone(&track),
        &ExtinctionTable::jwst_hst(),
        &CmdCutParams::default(),
    )
    .unwrap();

    let mut buf = Vec::new();
    write_members(&cut.partition, &mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert_eq!(text.lines().count(), cut.partition.n_members() + 1);

    let dir = Utf8PathBuf::from_path_buf(std::env::temp_dir()).unwrap();
    let members = dir.join(format!("cmdcut_members_{}.csv", std::process::id()));
    let geometry = dir.join(format!("cmdcut_geometry_{}.csv", std::process::id()));
    export_partition(&cut.partition, &members, &geometry).unwrap();

    let written = std::fs::read_to_string(&geometry).unwrap();
    assert_eq!(written.lines().count(), 9);
    std::fs::remove_file(&members).unwrap();
    std::fs::remove_file(&geometry).unwrap();
}
