use bio_core::TermKey;
use bio_results::array::{ElementOrder, write_array};
use bio_results::*;
use ndarray::Array3;

fn unique_temp_dir(tag: &str) -> std::path::PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("bio_results_{tag}_{nanos}"));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn dump(files: &RunFiles, key: TermKey, tidx: u32, n: u32, arr: &Array3<f64>) {
    write_array(&files.budget(key, tidx, n), arr, ElementOrder::Fortran).unwrap();
}

#[test]
fn indexes_budget_dumps_by_name() {
    let dir = unique_temp_dir("index");
    let files = RunFiles::new(&dir, 1);
    let arr = Array3::<f64>::zeros((2, 3, 4));
    for tidx in [100, 200] {
        dump(&files, TermKey::new(0, 1), tidx, tidx / 10, &arr);
        dump(&files, TermKey::new(0, 2), tidx, tidx / 10, &arr);
    }
    dump(&files, TermKey::new(3, 4), 200, 20, &arr);
    // another run in the same directory is ignored
    dump(&RunFiles::new(&dir, 2), TermKey::new(1, 1), 300, 30, &arr);

    let src = RawSource::new(&dir, 1);
    assert_eq!(src.budget_tidx_list().unwrap(), vec![100, 200]);
    assert_eq!(src.sample_counts().unwrap(), vec![10, 20]);
    assert_eq!(src.last_budget_n().unwrap(), 20);
    assert_eq!(src.existing_budgets().unwrap(), vec![0, 3, 5]);
    assert!(matches!(src.field_tidxs(), Err(ResultsError::DatasetNotFound { .. })));

    let mean = src.existing_terms(Some(&[0]), false).unwrap();
    assert_eq!(mean, vec!["ubar".to_string(), "vbar".to_string()]);

    let wakes = src.existing_terms(Some(&[5]), true).unwrap();
    assert_eq!(wakes, vec!["uwake".to_string(), "vwake".to_string()]);
    assert!(src.existing_terms(Some(&[5]), false).unwrap().is_empty());

    let all = src.existing_terms(None, false).unwrap();
    assert_eq!(all, vec!["ubar".to_string(), "vbar".to_string(), "TKE_p_transport".to_string()]);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn load_reshapes_column_major_and_reports_missing() {
    let dir = unique_temp_dir("load");
    let files = RunFiles::new(&dir, 1);
    let ubar = Array3::from_shape_fn((2, 3, 4), |(i, j, k)| (100 * i + 10 * j + k) as f64);
    dump(&files, TermKey::new(0, 1), 50, 7, &ubar);
    // truncated dump: must not come back as a partial array nor pass for an absent one
    std::fs::write(files.budget(TermKey::new(0, 2), 50, 7), [0u8; 40]).unwrap();

    let src = RawSource::new(&dir, 1);
    let names: Vec<String> = ["ubar", "vbar", "wbar"].iter().map(|s| s.to_string()).collect();
    let loaded = src.load(&names, Some(50), [2, 3, 4]).unwrap();

    assert_eq!(loaded.tidx, Some(50));
    assert_eq!(loaded.n, Some(7));
    assert_eq!(loaded.arrays["ubar"], ubar);
    assert_eq!(loaded.arrays.len(), 1);
    assert_eq!(loaded.missing, vec!["wbar".to_string()]);
    assert_eq!(loaded.unreadable, vec!["vbar".to_string()]);

    // no tidx given: last budget tidx
    let loaded = src.load(&names[..1], None, [2, 3, 4]).unwrap();
    assert_eq!(loaded.tidx, Some(50));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn fields_info_planes_and_turbines() {
    let dir = unique_temp_dir("extras");
    let files = RunFiles::new(&dir, 4);
    let u = Array3::from_shape_fn((3, 2, 2), |(i, j, k)| (i + 3 * j + 6 * k) as f64);
    write_array(&files.field("uVel", 10), &u, ElementOrder::Fortran).unwrap();
    std::fs::write(files.info(10), "  1.25000000D+01   3\n").unwrap();

    let plane = ndarray::Array2::from_shape_fn((3, 2), |(i, k)| (10 * i + k) as f64);
    write_array(&files.plane(PlaneAxis::Y, 1, 10, "u"), &plane, ElementOrder::Fortran).unwrap();

    std::fs::write(files.turbine(TurbineProperty::Power, 10, 1), "0.5\n").unwrap();
    std::fs::write(files.turbine(TurbineProperty::Uvel, 10, 1), "1.0\n2.0\n").unwrap();

    let src = RawSource::new(&dir, 4);
    assert_eq!(src.field_tidxs().unwrap(), vec![10]);
    assert_eq!(src.sim_time(10).unwrap(), 12.5);
    assert_eq!(src.read_field("u", 10, [3, 2, 2]).unwrap(), u);
    assert!(src.read_field("nope", 10, [3, 2, 2]).is_err());
    assert_eq!(src.read_plane(PlaneAxis::Y, 1, 10, "u", [3, 2]).unwrap(), plane);
    assert_eq!(src.turbine_tidxs().unwrap(), vec![10]);
    assert_eq!(src.read_turbine_file(TurbineProperty::Power, 10, 1).unwrap(), vec![0.5]);
    assert_eq!(src.read_turbine_file(TurbineProperty::Uvel, 10, 1).unwrap(), vec![1.0, 2.0]);

    std::fs::remove_dir_all(&dir).ok();
}
