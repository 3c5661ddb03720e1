use gmtsar_stack::core::tops_stack::{list_raw_archives, prepare_tops_stack};
use gmtsar_stack::io::PrmFile;
use gmtsar_stack::{OrbitSource, SarError, SarResult, SubswathMetadata, ToolRunner};
use std::cell::RefCell;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

const ANNOTATION: &str = include_str!("data/s1a-iw1-slc-vv-20160501t012345-20160501t012412-011051-010bfb-004.xml");

/// Zip a minimal SAFE product for the given acquisition day (`YYYYMMDD`)
fn write_product(raw: &Path, day: &str) -> PathBuf {
    let iso_day = format!("{}-{}-{}T", &day[..4], &day[4..6], &day[6..]);
    let product = format!("S1A_IW_SLC__1SDV_{}T012345_{}T012412_011051_010BFB_A1B2", day, day);
    let stem = format!("s1a-iw1-slc-vv-{}t012345-{}t012412-011051-010bfb-004", day, day);

    let path = raw.join(format!("{}.zip", product));
    let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
    let options = zip::write::FileOptions::default();

    zip.start_file(format!("{}.SAFE/manifest.safe", product), options).unwrap();
    zip.write_all(b"<manifest/>").unwrap();
    zip.start_file(format!("{}.SAFE/annotation/calibration/calibration-{}.xml", product, stem), options)
        .unwrap();
    zip.write_all(b"<calibration/>").unwrap();
    zip.start_file(format!("{}.SAFE/annotation/{}.xml", product, stem), options).unwrap();
    zip.write_all(ANNOTATION.replace("2016-05-01T", &iso_day).as_bytes()).unwrap();
    zip.start_file(format!("{}.SAFE/measurement/{}.tiff", product, stem), options).unwrap();
    zip.write_all(&[0u8; 64]).unwrap();
    zip.finish().unwrap();
    path
}

/// Drops a fake precise orbit file for each scene
struct LocalOrbits;

impl OrbitSource for LocalOrbits {
    fn fetch_orbit(&self, meta: &SubswathMetadata, dest_dir: &Path) -> SarResult<PathBuf> {
        let day = meta.start_time.format("%Y%m%d");
        let path = dest_dir.join(format!(
            "S1A_OPER_AUX_POEORB_OPOD_20160601T121640_V{}T000000_{}T235959.EOF",
            day, day
        ));
        fs::write(&path, "<Earth_Explorer_File/>")?;
        Ok(path)
    }
}

struct ScriptedTools {
    dir: PathBuf,
    calls: RefCell<Vec<String>>,
}

impl ToolRunner for ScriptedTools {
    fn run(&self, tool: &str, args: &[String]) -> SarResult<String> {
        self.calls.borrow_mut().push(format!("{} {}", tool, args.join(" ")));
        match tool {
            "make_s1a_tops" => {
                assert!(self.dir.join(&args[0]).is_file(), "annotation not extracted");
                assert!(self.dir.join(&args[1]).is_file(), "measurement not extracted");
                fs::write(self.dir.join(format!("{}.PRM", args[2])), "num_valid_az = 9966\n")?;
                fs::write(self.dir.join(format!("{}.SLC", args[2])), [0u8; 16])?;
                Ok(String::new())
            }
            "ext_orb_s1a" => {
                assert!(self.dir.join(&args[1]).is_file(), "orbit not fetched");
                fs::write(self.dir.join(format!("{}.LED", args[2])), "")?;
                Ok(String::new())
            }
            "calc_dop_orb" => {
                fs::write(self.dir.join(&args[1]), "SC_vel = 7590.1\n")?;
                Ok(String::new())
            }
            "SAT_baseline" => {
                let bperp = if args[1].contains("20160501") { 42.0 } else { 0.0 };
                Ok(format!("B_perpendicular = {}\nB_parallel = 3.5\n", bperp))
            }
            other => Err(SarError::Tool {
                tool: other.to_string(),
                message: "not scripted".to_string(),
            }),
        }
    }
}

#[test]
fn test_prepare_tops_stack() {
    let _ = env_logger::builder().is_test(true).try_init();

    let workdir = tempfile::tempdir().expect("Failed to create temp directory");
    let raw = workdir.path().join("raw");
    fs::create_dir_all(&raw).unwrap();
    write_product(&raw, "20160513");
    write_product(&raw, "20160501");
    fs::write(raw.join("notes.txt"), "not a product").unwrap();

    let archives = list_raw_archives(workdir.path()).unwrap();
    assert_eq!(archives.len(), 2);
    assert!(archives[0].to_string_lossy().contains("20160501"));

    let slc = workdir.path().join("SLC");
    let tools = ScriptedTools {
        dir: slc.clone(),
        calls: RefCell::new(Vec::new()),
    };
    let stack = prepare_tops_stack(workdir.path(), 1, &tools, &LocalOrbits).expect("Stack preparation failed");

    let calls = tools.calls.borrow();
    for call in calls.iter() {
        println!("{}", call);
    }
    let tools_used: Vec<&str> = calls.iter().map(|c| c.split(' ').next().unwrap()).collect();
    assert_eq!(
        tools_used,
        [
            "make_s1a_tops",
            "ext_orb_s1a",
            "calc_dop_orb",
            "make_s1a_tops",
            "ext_orb_s1a",
            "calc_dop_orb",
            "SAT_baseline",
            "SAT_baseline",
        ]
    );
    assert_eq!(
        calls[0],
        "make_s1a_tops s1a-iw1-slc-vv-20160501t012345-20160501t012412-011051-010bfb-004.xml \
         s1a-iw1-slc-vv-20160501t012345-20160501t012412-011051-010bfb-004.tiff IW1_20160501 0"
    );
    // The last scene is the baseline reference
    assert_eq!(calls[6], "SAT_baseline IW1_20160513.PRM IW1_20160501.PRM");

    let prefixes: Vec<&str> = stack.scenes.iter().map(|s| s.prefix.as_str()).collect();
    assert_eq!(prefixes, ["IW1_20160501", "IW1_20160513"]);

    let data_in = fs::read_to_string(slc.join("data.in")).unwrap();
    assert_eq!(
        data_in,
        "s1a-iw1-slc-vv-20160501t012345-20160501t012412-011051-010bfb-004:\
         S1A_OPER_AUX_POEORB_OPOD_20160601T121640_V20160501T000000_20160501T235959.EOF\n\
         s1a-iw1-slc-vv-20160513t012345-20160513t012412-011051-010bfb-004:\
         S1A_OPER_AUX_POEORB_OPOD_20160601T121640_V20160513T000000_20160513T235959.EOF\n"
    );

    assert_eq!(
        fs::read_to_string(slc.join("bl_list.txt")).unwrap(),
        "20160501 42.000000 3.500000 IW1_20160501.SLC\n20160513 0.000000 3.500000 IW1_20160513.SLC\n"
    );
    assert_eq!(
        PrmFile::read(slc.join("IW1_20160513.PRM")).unwrap().get("SC_vel"),
        Some("7590.1")
    );
    // Two scenes tie on distance to the mean; the first wins
    assert_eq!(stack.optimal_reference.as_deref(), Some("20160501"));
}

#[test]
fn test_invalid_swath() {
    let workdir = tempfile::tempdir().unwrap();
    let tools = ScriptedTools {
        dir: workdir.path().join("SLC"),
        calls: RefCell::new(Vec::new()),
    };
    let result = prepare_tops_stack(workdir.path(), 4, &tools, &LocalOrbits);
    assert!(matches!(result, Err(SarError::Config(_))));
}

#[test]
fn test_empty_raw_directory() {
    let workdir = tempfile::tempdir().unwrap();
    fs::create_dir_all(workdir.path().join("raw")).unwrap();
    let tools = ScriptedTools {
        dir: workdir.path().join("SLC"),
        calls: RefCell::new(Vec::new()),
    };
    let result = prepare_tops_stack(workdir.path(), 1, &tools, &LocalOrbits);
    assert!(matches!(result, Err(SarError::Processing(_))));
}
