//! Client unit tests
//!
//! Exercise the public API pieces that need no live THREDDS server:
//! configuration, url building, publication masking, and result seaming.

use cdip_client::flags::flag_categories;
use cdip_client::urls::{dataset_filename, dataset_url, deployment_name, external_url};
use cdip_client::{
    ClientConfig, DataRequest, DatasetKind, DodsClient, LatestStation, NcFile, PubSet,
    RequestResult,
};
use cdip_dap::{ArrayValues, DapDim, DapType, DataArray, Das, MaskedArray};

// ============== Configuration Tests ==============

#[test]
fn test_config_default() {
    let config = ClientConfig::default();
    assert_eq!(config.thredds_domain, "http://thredds.cdip.ucsd.edu");
    assert_eq!(config.cdip_domain, "http://cdip.ucsd.edu");
    assert_eq!(config.connect_timeout.as_secs(), 10);
    assert_eq!(config.read_timeout.as_secs(), 30);
}

#[test]
fn test_config_builder() {
    let config = ClientConfig::default()
        .with_thredds_domain("http://mirror.example.org")
        .with_cdip_domain("http://cdip.example.org")
        .with_read_timeout(std::time::Duration::from_secs(90));
    assert_eq!(config.thredds_domain, "http://mirror.example.org");
    assert_eq!(config.cdip_domain, "http://cdip.example.org");
    assert_eq!(config.read_timeout.as_secs(), 90);
}

#[test]
fn test_client_rejects_malformed_domain() {
    let config = ClientConfig::default().with_thredds_domain("thredds cdip");
    assert!(DodsClient::new(config).is_err());
}

// ============== Url Building Tests ==============

#[test]
fn test_nc_file_urls_follow_the_server_layout() {
    let client = DodsClient::new(ClientConfig::default()).unwrap();

    let rt = NcFile::new(&client, "100p1", DatasetKind::Realtime);
    assert_eq!(
        rt.url(),
        "http://thredds.cdip.ucsd.edu/thredds/dodsC/cdip/realtime/100p1_rt.nc"
    );
    assert_eq!(rt.filename(), "100p1_rt.nc");

    let dep = NcFile::new(&client, "100p1", DatasetKind::Archive("d07".into()));
    assert_eq!(
        dep.url(),
        "http://thredds.cdip.ucsd.edu/thredds/dodsC/cdip/archive/100p1/100p1_d07.nc"
    );

    let latest = NcFile::latest(&client);
    assert_eq!(
        latest.url(),
        "http://thredds.cdip.ucsd.edu/thredds/dodsC/cdip/realtime/latest_3day.nc"
    );
}

#[test]
fn test_external_files_keep_the_full_dataset_label() {
    let domain = "http://thredds.cdip.ucsd.edu";
    assert_eq!(
        external_url(domain, "ww3", "46225", &DatasetKind::Historic),
        "http://thredds.cdip.ucsd.edu/thredds/dodsC/external/WW3/46225_WW3_historic.nc"
    );
}

#[test]
fn test_deployment_filenames() {
    assert_eq!(deployment_name(3), "d03");
    assert_eq!(
        dataset_filename("100p1", &DatasetKind::Archive(deployment_name(3))),
        "100p1_d03.nc"
    );
    assert_eq!(
        dataset_url("http://t", "100p1", &DatasetKind::RealtimeXy),
        "http://t/thredds/dodsC/cdip/realtime/100p1_xy.nc"
    );
}

// ============== Publication Mask Tests ==============

const FLAG_DAS: &str = r#"Attributes {
    waveFlagPrimary {
        Byte flag_values 1, 2, 3, 4, 9;
        String flag_meanings "good not_evaluated questionable bad missing";
    }
}"#;

fn byte_column(name: &str, vals: Vec<u8>) -> MaskedArray {
    MaskedArray::unmasked(DataArray {
        name: name.into(),
        dtype: DapType::Byte,
        dims: vec![DapDim {
            name: "waveTime".into(),
            size: vals.len(),
        }],
        values: ArrayValues::Byte(vals),
    })
}

#[test]
fn test_pub_set_parsing_and_masking_pipeline() {
    // "public" is shorthand for released good records
    let set = PubSet::parse("public");
    assert_eq!(set, PubSet::PublicGood);

    let primary = [1, 4, 4, 3];
    let secondary = [0, 1, 0, 0];
    let excluded = set.row_mask(&primary, Some(&secondary));
    assert_eq!(excluded, vec![false, true, true, true]);

    // compressing with the exclusion mask keeps released rows only
    let hs = byte_column("waveHs", vec![10, 11, 12, 13]).compress_rows(&excluded);
    assert_eq!(hs.values, ArrayValues::Byte(vec![10]));

    // the nonpub set keeps exactly the released-to-nobody rows
    let nonpub = PubSet::parse("nonpub").row_mask(&primary, Some(&secondary));
    assert_eq!(nonpub, vec![true, false, true, true]);
}

#[test]
fn test_flag_categories_from_das() {
    let das = Das::parse(FLAG_DAS).unwrap();
    let cats = flag_categories(&das, "waveFlagPrimary").unwrap();
    assert_eq!(cats.label(1), "good");
    assert_eq!(cats.label(9), "missing");
    assert_eq!(cats.label(77), "unknown");
    assert!(flag_categories(&das, "sstFlagPrimary").is_none());
}

// ============== Request and Result Tests ==============

#[test]
fn test_request_builder() {
    let req = DataRequest::new(1_000, 2_000, &["waveHs", "waveTp"])
        .with_pub_set(PubSet::BothGoodall)
        .with_apply_mask(false);
    assert_eq!(req.start, 1_000);
    assert_eq!(req.end, 2_000);
    assert_eq!(req.vars, vec!["waveHs", "waveTp"]);
    assert_eq!(req.pub_set, PubSet::BothGoodall);
    assert!(!req.apply_mask);
}

#[test]
fn test_merge_seams_older_rows_first() {
    let mut older = RequestResult::new();
    older.insert("waveFlagPrimary", byte_column("waveFlagPrimary", vec![1, 2]));
    let mut newer = RequestResult::new();
    newer.insert("waveFlagPrimary", byte_column("waveFlagPrimary", vec![3]));
    newer.insert("waveHs", byte_column("waveHs", vec![9]));

    let merged = RequestResult::merge(older, newer).unwrap();
    assert_eq!(
        merged.get("waveFlagPrimary").unwrap().values,
        ArrayValues::Byte(vec![1, 2, 3])
    );
    // variables on one side only pass through
    assert_eq!(merged.get("waveHs").unwrap().len(), 1);
}

#[test]
fn test_merge_rejects_mismatched_halves() {
    let mut older = RequestResult::new();
    older.insert("waveHs", byte_column("waveHs", vec![1]));
    let mut newer = RequestResult::new();
    newer.insert(
        "waveHs",
        MaskedArray::unmasked(DataArray {
            name: "waveHs".into(),
            dtype: DapType::Float32,
            dims: vec![DapDim {
                name: "waveTime".into(),
                size: 1,
            }],
            values: ArrayValues::Float32(vec![1.5]),
        }),
    );
    assert!(RequestResult::merge(older, newer).is_err());
}

#[test]
fn test_latest_station_serializes_camel_case() {
    let station = LatestStation {
        site_label: "100p1".to_string(),
        station_name: "TORREY PINES OUTER, CA".to_string(),
        latitude: Some(32.933),
        longitude: Some(-117.391),
        water_depth: Some(550.0),
        wave_time: 1_700_000_000,
        wave_hs: Some(1.23),
        wave_tp: Some(12.5),
        wave_dp: Some(285.0),
        sst_time: None,
        sst: None,
    };
    let json = serde_json::to_value(&station).unwrap();
    assert_eq!(json["siteLabel"], "100p1");
    assert_eq!(json["waveTime"], 1_700_000_000);
    assert_eq!(json["waveHs"], 1.23);
    assert!(json["sstSeaSurfaceTemperature"].is_null());
}
