use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use bio_project::{NamelistParser, ProjectError, TurbineArray};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("{}_{}", prefix, nanos));
    dir
}

#[test]
fn reads_turbine_decks_in_file_order() {
    let dir = unique_temp_dir("bio_project_turbines");
    fs::create_dir_all(&dir).expect("failed to create turbine dir");
    fs::write(
        dir.join("turb01.inp"),
        "&ACTUATOR_DISK\nxLoc = 6.0, yLoc = 2.5, zLoc = 0.5\ndiam = 0.16\ncT = 0.75\n/\n",
    )
    .expect("failed to write deck");
    fs::write(
        dir.join("turb02.inp"),
        "&ACTUATOR_DISK\nxLoc = 3.0d0, yLoc = 2.5, zLoc = 0.5\ndiam = 0.16\ncT = 0.75\n/\n",
    )
    .expect("failed to write deck");
    fs::write(
        dir.join("turb03.inp"),
        "&ACTUATOR_DISK\nxLoc = 9.0, yLoc = 2.5, zLoc = 0.5\n/\n",
    )
    .expect("failed to write deck");

    let array =
        TurbineArray::from_dir(&dir, Some(2), 5, &NamelistParser).expect("failed to read decks");
    assert_eq!(array.len(), 2);
    assert_eq!(array.num_turbines, 2);
    let first = array.first().unwrap();
    assert_eq!(first.n, 2);
    assert_eq!(first.pos(), [3.0, 2.5, 0.5]);
    assert_eq!(first.diameter(), Some(0.16));
    assert_eq!(array.by_index(1).unwrap().thrust_coefficient(), Some(0.75));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn missing_turbine_dir_is_reported() {
    let dir = unique_temp_dir("bio_project_no_turbines");
    let err = TurbineArray::from_dir(&dir, None, 5, &NamelistParser).unwrap_err();
    assert!(matches!(err, ProjectError::TurbineDirNotFound { .. }));
}

#[test]
fn turbine_array_roundtrips_through_json() {
    let dir = unique_temp_dir("bio_project_turbine_json");
    fs::create_dir_all(&dir).expect("failed to create turbine dir");
    fs::write(
        dir.join("turb01.inp"),
        "&ACTUATOR_DISK\nxLoc = 1.0, yLoc = 2.0, zLoc = 3.0\n/\n",
    )
    .expect("failed to write deck");

    let array = TurbineArray::from_dir(&dir, None, 2, &NamelistParser).unwrap();
    let json = serde_json::to_string(&array).unwrap();
    let back: TurbineArray = serde_json::from_str(&json).unwrap();
    assert_eq!(array, back);

    let _ = fs::remove_dir_all(&dir);
}
