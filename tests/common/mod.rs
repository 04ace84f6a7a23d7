#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cmdcut::{
    catalog::{Catalog, CoordinateColumns, ErrorCut, FilterSet, PhotometryTable, QualityCriteria},
    isochrone::IsochroneGrid,
};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn data_path(name: &str) -> Utf8PathBuf {
    Utf8Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

pub fn load_table() -> PhotometryTable {
    PhotometryTable::from_csv_path(&data_path("catalog.csv")).unwrap()
}

pub fn load_grid() -> IsochroneGrid {
    IsochroneGrid::from_csv_path(&data_path("isochrones.csv")).unwrap()
}

/// Quality and error cuts of the synthetic catalog, as a F115W - F150W CMD.
pub fn load_catalog() -> Catalog {
    let filters = FilterSet::new("f115w", "f150w");
    let (accepted, _) = load_table()
        .quality_split(&QualityCriteria::default())
        .unwrap();
    accepted
        .error_cut(&filters, ErrorCut::default())
        .unwrap()
        .to_catalog(&filters, &CoordinateColumns::default())
        .unwrap()
}

pub fn assert_no_star_in_two_bins(partition: &cmdcut::partition::Partition<'_>, catalog: &Catalog) {
    for star in catalog.iter() {
        let owners = partition.iter().filter(|b| b.contains(star)).count();
        assert!(owners <= 1, "star {star:?} is in {owners} bins");
    }
}
