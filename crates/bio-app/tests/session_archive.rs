mod common;

use bio_app::*;
use bio_results::RunFiles;
use bio_results::array::{ElementOrder, write_array};
use common::{raw_run, ubar, vbar, write_text};
use ndarray::{Array2, Array3};

const TURBINE_INPUT: &str = "\
&io
 runid = 1
/
&input
 nx = 4, ny = 4, nz = 4
 lx = 4.0, ly = 4.0, lz = 4.0
/
&windturbines
 usewindturbines = .true.
 num_turbines = 1
 adm_type = 5
 turbinfodir = '/nonexistent/turb'
/
";

/// Raw run with one turbine, a field dump at tidx 100 and turbine series at 100 and 200.
fn turbine_run(tag: &str) -> std::path::PathBuf {
    let dir = raw_run(tag);
    std::fs::write(dir.join("Run01_input.dat"), TURBINE_INPUT).unwrap();
    std::fs::create_dir_all(dir.join("turb")).unwrap();
    std::fs::write(
        dir.join("turb").join("turb01.inp"),
        "&actuator_disk\n xloc = 1.0, yloc = 2.0, zloc = 1.5\n diam = 1.0, ct = 0.75\n/\n",
    )
    .unwrap();

    let files = RunFiles::new(&dir, 1);
    write_array(&files.field("uVel", 100), &ubar(0), ElementOrder::Fortran).unwrap();
    std::fs::write(files.info(100), "  1.25000000D+01   3\n").unwrap();
    write_text(&files.turbine(TurbineProperty::Power, 100, 1), &[1.0, 2.0, 3.0]);
    write_text(&files.turbine(TurbineProperty::Power, 200, 1), &[3.0, 4.0]);
    dir
}

fn archive_roundtrip(format: ArchiveFormat) {
    let dir = raw_run(&format!("roundtrip_{format}"));
    let mut raw = BudgetSession::open(&dir, SessionOptions::raw(1)).unwrap();

    let mut request = WriteRequest::new(format);
    request.terms = TermSelector::names(["ubar", "vbar"]);
    let path = raw.write_archive(&request).unwrap();
    assert!(path.is_file());
    assert_eq!(path.extension().unwrap(), format.extension());

    let mut archived = BudgetSession::open(&dir, SessionOptions::archive(format)).unwrap();
    assert_eq!(archived.backend_kind(), BackendKind::Archive(format));
    assert_eq!(archived.grid().dims(), [4, 4, 4]);
    assert_eq!(archived.grid().z().coords().to_vec(), vec![0.5, 1.5, 2.5, 3.5]);
    assert_eq!(archived.metadata().unwrap().source_tidx, Some(200));
    assert_eq!(archived.metadata().unwrap().source_n, Some(20));

    let report = archived.read_budgets(&TermSelector::All, None, false).unwrap();
    assert_eq!(report.loaded, vec!["ubar", "vbar"]);
    assert_eq!(archived.budget("ubar").unwrap(), &ubar(200));
    assert_eq!(archived.budget("vbar").unwrap(), &vbar(200));
    assert_eq!(archived.budget_tidx(), None);

    // raw-only operations are refused
    let err = archived.read_fields(None, None).unwrap_err();
    assert!(matches!(err, AppError::Unsupported { .. }));

    // refuse to clobber, then overwrite on request
    let err = raw.write_archive(&request).unwrap_err();
    assert!(err.is_destination_exists());
    request.overwrite = true;
    request.terms = TermSelector::names(["ubar"]);
    raw.write_archive(&request).unwrap();
    let reopened = BudgetSession::open(&dir, SessionOptions::archive(format)).unwrap();
    assert_eq!(reopened.existing_terms(None, false).unwrap(), vec!["ubar"]);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn npz_archive_roundtrip() {
    archive_roundtrip(ArchiveFormat::Npz);
}

#[test]
fn mat_archive_roundtrip() {
    archive_roundtrip(ArchiveFormat::Mat);
}

#[test]
fn sliced_archive_keeps_sliced_grid() {
    let dir = raw_run("sliced");
    let mut raw = BudgetSession::open(&dir, SessionOptions::raw(1)).unwrap();

    let mut request = WriteRequest::new(ArchiveFormat::Npz);
    request.terms = TermSelector::names(["ubar"]);
    request.bounds = SliceBounds::full().z(Bound::At(1.4));
    request.stem = Some("hub".to_string());
    raw.write_archive(&request).unwrap();

    let options = SessionOptions {
        stem: Some("hub".to_string()),
        ..SessionOptions::archive(ArchiveFormat::Npz)
    };
    let mut archived = BudgetSession::open(&dir, options).unwrap();
    assert_eq!(archived.grid().dims(), [4, 4, 1]);
    assert_eq!(archived.grid().z().coords().to_vec(), vec![1.5]);

    archived
        .read_budgets(&TermSelector::names(["ubar"]), None, false)
        .unwrap();
    let u = ubar(200);
    let hub = archived.budget("ubar").unwrap();
    assert_eq!(hub.shape(), &[4, 4, 1]);
    assert_eq!(hub[[2, 3, 0]], u[[2, 3, 1]]);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn missing_archive_is_reported() {
    let dir = raw_run("no_archive");
    let err = BudgetSession::open(&dir, SessionOptions::archive(ArchiveFormat::Mat)).unwrap_err();
    assert!(err.is_dataset_not_found());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn fields_planes_and_turbine_series() {
    let dir = turbine_run("readers");
    let files = RunFiles::new(&dir, 1);
    let plane = Array2::from_shape_fn((4, 4), |(j, k)| (10 * j + k) as f64);
    write_array(&files.plane(PlaneAxis::X, 2, 100, "u"), &plane, ElementOrder::Fortran).unwrap();

    let mut session = BudgetSession::open(&dir, SessionOptions::raw(1)).unwrap();
    assert!(session.has_turbines());
    assert!(session.has_fields());
    assert_eq!(session.physics().n_turbines, 1);

    let read = session.read_fields(None, None).unwrap();
    assert_eq!(read, vec!["u"]);
    assert_eq!(session.field_tidx(), Some(100));
    assert_eq!(session.sim_time(), Some(12.5));
    assert_eq!(session.field("u").unwrap(), &ubar(0));
    assert_eq!(session.unique_times().unwrap(), vec![12.5]);

    let sl = session.read_plane(PlaneAxis::X, 2, &["u"], &[100]).unwrap();
    assert_eq!(sl.x().to_vec(), vec![1.0]);
    assert_eq!(sl.collapsed, [true, false, false]);
    assert_eq!(sl.get("u_100").unwrap(), &plane.clone().into_dyn());
    assert!(session.read_plane(PlaneAxis::X, 5, &["u"], &[100]).is_err());

    // steady by default for a single time index: mean of the file
    let last = session.read_turbine_power(TidxSelection::Last, 1).unwrap();
    assert_eq!(last, vec![2.0]);
    // every time index, repeated values dropped
    let all = session
        .read_turbine_property(TidxSelection::All, TurbineProperty::Power, 1, None)
        .unwrap();
    assert_eq!(all, vec![1.0, 2.0, 3.0, 4.0]);
    let steady = session
        .read_turbine_property(TidxSelection::List(vec![100, 200]), TurbineProperty::Power, 1, Some(true))
        .unwrap();
    assert_eq!(steady, vec![2.0, 3.5]);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn turbine_origin_and_archived_series() {
    let dir = turbine_run("turbine_archive");
    let options = SessionOptions {
        origin: Some(Origin::Turbine),
        ..SessionOptions::raw(1)
    };
    let mut raw = BudgetSession::open(&dir, options).unwrap();
    assert!(raw.grid().is_normalized());
    assert_eq!(raw.grid().origin(), [1.0, 2.0, 1.5]);
    assert_eq!(raw.grid().x().coords().to_vec(), vec![-1.0, 0.0, 1.0, 2.0]);

    let mut request = WriteRequest::new(ArchiveFormat::Npz);
    request.terms = TermSelector::names(["ubar"]);
    raw.write_archive(&request).unwrap();

    let archived = BudgetSession::open(&dir, SessionOptions::archive(ArchiveFormat::Npz)).unwrap();
    assert_eq!(archived.grid().origin(), [1.0, 2.0, 1.5]);
    assert_eq!(archived.turbines().unwrap().len(), 1);
    let power = archived
        .read_turbine_property(TidxSelection::All, TurbineProperty::Power, 1, None)
        .unwrap();
    assert_eq!(power, vec![1.0, 2.0, 3.0, 4.0]);
    let err = archived
        .read_turbine_property(TidxSelection::All, TurbineProperty::Vvel, 1, None)
        .unwrap_err();
    assert!(matches!(err, AppError::SeriesNotFound { .. }));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn ad_hoc_fields_slice_on_the_session_grid() {
    let dir = raw_run("adhoc");
    let session = BudgetSession::open(&dir, SessionOptions::raw(1)).unwrap();

    let mut fields = std::collections::BTreeMap::new();
    fields.insert("a".to_string(), Array3::from_elem((4, 4, 4), 1.0));
    fields.insert("b".to_string(), Array3::from_elem((4, 4, 4), 2.0));
    let keys = vec!["b".to_string()];
    let sl = session
        .slice_fields(&fields, Some(&keys), SliceBounds::full().z(Bound::At(0.0)), false)
        .unwrap();
    assert_eq!(sl.keys(), vec!["b"]);
    assert_eq!(sl.get("b").unwrap().shape(), &[4, 4]);

    fields.insert("bad".to_string(), Array3::zeros((2, 2, 2)));
    assert!(session.slice_fields(&fields, None, SliceBounds::full(), false).is_err());

    std::fs::remove_dir_all(&dir).ok();
}
