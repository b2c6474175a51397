use std::io::Write;

use ddmd::{potential::PairPotential, Config, ConfigError};
use tempfile::NamedTempFile;

fn write_config(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

#[test]
fn loads_every_section_from_a_file() {
    let file = write_config(
        r#"
        [boundary]
        lengths = [12.0, 10.0, 8.0]

        [domain]
        grid = [2, 2, 1]
        skin = 0.3

        [storage]
        atom_capacity = 5000
        ghost_capacity = 6000
        bond_capacity = 7000

        [pair]
        style = "dpd"
        cutoff = 1.0
        a = [[25.0, 30.0], [30.0, 25.0]]

        [bond]
        style = "harmonic"
        kappa = [50.0]
        length = [0.85]

        [integrator]
        dt = 0.01
        n_step = 20
        log_interval = 5

        [system]
        n_molecule = 40
        chain_length = 5
        n_atom_type = 2
        temperature = 1.5
        seed = 7

        [run]
        max_wall_time = 120.0
        "#,
    );
    let config = Config::from_path(file.path()).unwrap();
    assert_eq!(config.boundary.lengths, [12.0, 10.0, 8.0]);
    assert_eq!(config.domain.n_rank(), 4);
    assert_eq!(config.storage.ghost_capacity, 6000);
    assert!(matches!(config.pair, PairPotential::Dpd { .. }));
    assert_eq!(config.integrator.n_step, 20);
    assert_eq!(config.system.n_atom(), 200);
    assert_eq!(config.system.n_bond(), 160);
    assert_eq!(config.run.max_wall_time, Some(120.0));

    let system = config.system_config();
    assert_eq!(system.atom_capacity, 5000);
    assert_eq!(system.bond_capacity, 7000);
    assert!((system.pair_cutoff() - 1.3).abs() < 1e-12);
}

#[test]
fn missing_file_reports_its_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    match Config::from_path(&path) {
        Err(ConfigError::Read { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn invalid_values_name_their_section() {
    let cases = [
        ("[boundary]\nlengths = [10.0, 0.0, 10.0]\n", None),
        ("[domain]\ngrid = [0, 1, 1]\n", Some("domain")),
        ("[pair]\nstyle = \"dpd\"\ncutoff = 1.0\na = [[25.0, 1.0]]\n", Some("pair")),
        ("[bond]\nstyle = \"harmonic\"\nkappa = [1.0, 2.0]\nlength = [1.0]\n", Some("bond")),
        ("[integrator]\ndt = -0.1\n", Some("integrator")),
        ("[system]\nchain_length = 0\n", Some("system")),
        ("[run]\nmax_wall_time = 0.0\n", Some("run")),
    ];
    for (text, section) in cases {
        let err = Config::from_path(write_config(text).path()).unwrap_err();
        match (section, &err) {
            (None, ConfigError::Boundary(_)) => {}
            (Some(expected), ConfigError::Invalid { section, .. }) => {
                assert_eq!(*section, expected, "{text}")
            }
            _ => panic!("{text}: unexpected {err:?}"),
        }
    }
}

#[test]
fn unknown_styles_fail_to_parse() {
    let file = write_config("[pair]\nstyle = \"morse\"\ncutoff = 1.0\n");
    assert!(matches!(
        Config::from_path(file.path()),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn shipped_config_is_valid() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/configs/melt.toml");
    let config = Config::from_path(path).unwrap();
    assert_eq!(config.domain.n_rank(), 8);
    assert_eq!(config.system.n_atom(), 12_000);
}
