//! Disc boots through the emulated BS2, with and without mod patches

mod common;

use common::*;
use oc_boot::BootSessionData;
use oc_core::error::BootError;
use oc_core::AlertLevel;
use oc_cpu::Msr;
use oc_disc::DriveState;
use oc_ios::state_flags::{state_flags_path, StateFlags, STATE_FLAGS_SIZE};
use oc_ios::kernel::ADDR_IOS_VERSION;

#[test]
fn test_gamecube_disc_boot() {
    let fixture = Fixture::new();
    let iso = fixture.write("game.iso", &build_gamecube_image("GTEE01", 1));

    let machine = fixture
        .manager()
        .boot_files(vec![iso], BootSessionData::default())
        .unwrap();

    assert_eq!(machine.cpu.pc, DOL_ENTRY);
    assert!(machine.cpu.msr.contains(Msr::FP | Msr::DR | Msr::IR));
    assert_eq!(machine.cpu.gpr[1], 0x8156_6550);
    assert_eq!(machine.cpu.gpr[2], 0x8146_5CC0);
    assert_eq!(machine.cpu.gpr[13], 0x8146_5320);

    assert_eq!(machine.memory.read_bytes(0x8000_0000, 6).unwrap(), b"GTEE01");
    assert_eq!(machine.memory.read_be32(0x8000_00F4).unwrap(), 0x817F_E000);
    assert_eq!(machine.memory.read_be32(0x8000_0038).unwrap(), 0x817F_DFE0);
    assert_eq!(machine.memory.read_be32(DOL_ENTRY).unwrap(), 0x6000_0000);
    // rfi in every exception vector
    assert_eq!(machine.memory.read_be32(0x8000_0500).unwrap(), 0x4C00_0064);

    assert!(machine.dvd.is_disc_inside());
    assert_eq!(machine.dvd.drive_state(), DriveState::ReadyNoReadsMade);
    assert!(machine.video.is_ntsc());
    assert_eq!(fixture.host.titles(), vec!["GTEE01".to_string()]);
    assert!(fixture.host.alerts().is_empty());
}

#[test]
fn test_pal_disc_uses_pal_registers() {
    let fixture = Fixture::new();
    let iso = fixture.write("game.iso", &build_gamecube_image("GTEP01", 2));

    let machine = fixture
        .manager()
        .boot_files(vec![iso], BootSessionData::default())
        .unwrap();

    assert_eq!(machine.cpu.gpr[1], 0x815E_DCA8);
    assert_eq!(machine.cpu.gpr[13], 0x814B_4FC0);
    assert!(!machine.video.is_ntsc());
}

#[test]
fn test_wii_disc_boot() {
    let fixture = Fixture::new();
    let iso = fixture.write("wii.iso", &build_wii_image("RTEE01"));

    let machine = fixture
        .manager()
        .boot_files(vec![iso], BootSessionData::default())
        .unwrap();

    assert_eq!(machine.cpu.pc, DOL_ENTRY);
    assert_eq!(machine.cpu.gpr[1], 0x816F_FFF0);
    assert_eq!(machine.memory.read_bytes(0x8000_0000, 6).unwrap(), b"RTEE01");
    assert_eq!(
        machine.memory.read_be32(0x8000_3180).unwrap(),
        u32::from_be_bytes(*b"RTEE")
    );
    assert_eq!(machine.memory.read_be32(ADDR_IOS_VERSION).unwrap() >> 16, 56);

    let record = machine.ios.fs().read_file(&state_flags_path()).unwrap();
    let record: [u8; STATE_FLAGS_SIZE] = record.try_into().unwrap();
    let flags = StateFlags::from_bytes(&record);
    assert_eq!((flags.flags, flags.r#type, flags.discstate), (0xC1, 0xFF, 0x01));
    assert!(flags.is_checksum_valid());
}

#[test]
fn test_multi_disc_playlist() {
    let fixture = Fixture::new();
    let first = fixture.write("disc1.iso", &build_gamecube_image("GTEE01", 1));
    let second = fixture.write("disc2.iso", &build_gamecube_image("GTEE01", 1));
    let playlist = fixture.write("set.m3u", b"disc1.iso\n# second disc\n\ndisc2.iso\n");

    let machine = fixture
        .manager()
        .boot_files(vec![playlist], BootSessionData::default())
        .unwrap();

    assert_eq!(machine.dvd.auto_disc_change_paths(), &[first, second]);
    assert_eq!(machine.cpu.pc, DOL_ENTRY);
}

#[test]
fn test_mod_descriptor_memory_patch() {
    let fixture = Fixture::new();
    fixture.write("game.iso", &build_gamecube_image("GTEE01", 1));
    let descriptor = fixture.write(
        "mod.json",
        br#"{
            "type": "game-mod-descriptor",
            "version": 1,
            "base-file": "game.iso",
            "patches": {
                "game": "GTE",
                "root": "mod",
                "memory": [
                    { "offset": 2147496192, "value": "38600001", "original": "60000000" }
                ]
            }
        }"#,
    );

    let machine = fixture
        .manager()
        .boot_files(vec![descriptor], BootSessionData::default())
        .unwrap();

    assert_eq!(machine.cpu.pc, DOL_ENTRY);
    assert_eq!(machine.memory.read_be32(DOL_ENTRY).unwrap(), 0x3860_0001);
    assert_eq!(machine.memory.read_be32(DOL_ENTRY + 4).unwrap(), 0x6000_0000);
}

#[test]
fn test_mod_for_another_game_is_ignored() {
    let fixture = Fixture::new();
    fixture.write("game.iso", &build_gamecube_image("GTEE01", 1));
    let descriptor = fixture.write(
        "mod.json",
        br#"{
            "type": "game-mod-descriptor",
            "version": 1,
            "base-file": "game.iso",
            "patches": {
                "game": "GZL",
                "memory": [ { "offset": 2147496192, "value": "38600001" } ]
            }
        }"#,
    );

    let machine = fixture
        .manager()
        .boot_files(vec![descriptor], BootSessionData::default())
        .unwrap();
    assert_eq!(machine.memory.read_be32(DOL_ENTRY).unwrap(), 0x6000_0000);
}

#[test]
fn test_mod_on_unrebuildable_disc_fails() {
    let fixture = Fixture::new();
    let mut image = build_gamecube_image("GTEE01", 1);
    // apploader size far beyond the end of the image
    image[0x2454..0x2458].copy_from_slice(&0x1000_0000u32.to_be_bytes());
    let iso = fixture.write("game.iso", &image);
    let descriptor = fixture.write(
        "mod.json",
        br#"{
            "type": "game-mod-descriptor",
            "version": 1,
            "base-file": "game.iso",
            "patches": {
                "game": "GTE",
                "root": "mod",
                "memory": [ { "offset": 2147496192, "value": "38600001" } ]
            }
        }"#,
    );

    let err = fixture
        .manager()
        .boot_files(vec![descriptor], BootSessionData::default())
        .unwrap_err();

    assert!(matches!(err, BootError::DiscMountFailed(ref p) if *p == iso));
    assert_eq!(fixture.host.alerts_of(AlertLevel::Error), vec![err.to_string()]);
    assert!(fixture.host.titles().is_empty());
}

#[test]
fn test_main_dol_past_end_of_disc_fails() {
    let fixture = Fixture::new();
    let mut image = build_gamecube_image("GTEE01", 1);
    // first text section size of the main DOL
    image[0x2460 + 0x90..0x2460 + 0x94].copy_from_slice(&0x7FFF_0000u32.to_be_bytes());
    let iso = fixture.write("game.iso", &image);

    let err = fixture
        .manager()
        .boot_files(vec![iso.clone()], BootSessionData::default())
        .unwrap_err();

    match &err {
        BootError::Bs2Failed { path, reason } => {
            assert_eq!(*path, iso);
            assert!(reason.contains("extends past the end of the disc"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(fixture.host.alerts_of(AlertLevel::Error).len(), 1);
}
