//! The six literal scenarios run against a simulated W25Q16JV (page=256,
//! sector=4096, total=2 MiB).

mod support;

use norcb::Error;
use support::Harness;

#[test]
fn scenario_1_fresh_init_is_idle_and_clean() {
    let (cb, _h) = Harness::new();
    assert!(!cb.busy());
    assert!(!cb.isero());
    assert_eq!(cb.flash_size(), 2 * 1024 * 1024);
}

#[test]
fn scenario_2_new_cb_geometry() {
    let (mut cb, _h) = Harness::new();

    let q0 = cb.new_cb(0x4711_4711, 244, 32).unwrap();
    let info0 = cb.queue_info(q0).unwrap();
    assert_eq!(info0.pages_per_elem, 2);
    assert_eq!(info0.max_entries, 32);
    assert_eq!(info0.start_sector, 0);
    assert_eq!(info0.stop_sector, 3);

    let q1 = cb.new_cb(0x0815_0815, 12280, 16).unwrap();
    let info1 = cb.queue_info(q1).unwrap();
    assert_eq!(info1.pages_per_elem, 49);
    assert_eq!(info1.start_sector, 4);
    assert_eq!(info1.stop_sector, 52);
}

#[test]
fn scenario_3_sixty_three_appends_advance_idmax() {
    let (mut cb, mut h) = Harness::new();
    let q0 = cb.new_cb(0x4711_4711, 244, 32).unwrap();
    cb.mkcb().unwrap();
    h.drive(&mut cb);

    for _ in 0..63u32 {
        let mut payload = [0u8; 244];
        payload[..6].copy_from_slice(&[0u8, 1, 2, 3, 4, 5]);
        cb.add(q0, &payload).unwrap();
        h.drive(&mut cb);
        cb.mkcb().unwrap();
        h.drive(&mut cb);
    }

    assert_eq!(cb.idmax(q0), 63);
    assert!(!cb.isero());
}

#[test]
fn scenario_4_raw_read_matches_flash_mirror() {
    let (mut cb, mut h) = Harness::new();
    let q0 = cb.new_cb(1, 244, 32).unwrap();
    cb.mkcb().unwrap();
    h.drive(&mut cb);

    let mut payload = [0x42u8; 244];
    payload[0] = 0xAA;
    cb.add(q0, &payload).unwrap();
    h.drive(&mut cb);
    cb.mkcb().unwrap();
    h.drive(&mut cb);

    let mut out = [0u8; 256];
    cb.flash_read(0, &mut out).unwrap();
    h.drive(&mut cb);
    assert_eq!(&out[..256], &h.flash.as_bytes()[..256]);
}

#[test]
fn scenario_5_append_then_get_last_round_trips() {
    let (mut cb, mut h) = Harness::new();
    let q0 = cb.new_cb(0x1234_5678, 244, 32).unwrap();
    cb.mkcb().unwrap();
    h.drive(&mut cb);

    let mut payload = [0u8; 244];
    for (i, b) in payload.iter_mut().enumerate() {
        *b = (i % 251) as u8;
    }
    cb.add(q0, &payload).unwrap();
    h.drive(&mut cb);
    cb.mkcb().unwrap();
    h.drive(&mut cb);

    let mut out = [0u8; 244];
    let id = cb.get_last(q0, &mut out).unwrap();
    h.drive(&mut cb);

    assert_eq!(out, payload);
    assert_eq!(id, cb.idmax(q0));
}

#[test]
fn scenario_6_byte_at_a_time_append_matches_one_shot() {
    let (mut cb, mut h) = Harness::new();
    let q0 = cb.new_cb(0xCAFE_BABE, 244, 32).unwrap();
    cb.mkcb().unwrap();
    h.drive(&mut cb);

    let mut payload = [0u8; 244];
    for (i, b) in payload.iter_mut().enumerate() {
        *b = i as u8;
    }

    for &byte in payload.iter() {
        cb.add_append(q0, core::slice::from_ref(&byte)).unwrap();
        h.drive(&mut cb);
    }
    cb.add_done(q0).unwrap();
    h.drive(&mut cb);
    cb.mkcb().unwrap();
    h.drive(&mut cb);

    let mut out = [0u8; 244];
    cb.get_last(q0, &mut out).unwrap();
    h.drive(&mut cb);
    assert_eq!(out, payload);
}

#[test]
fn unconfigured_handle_refuses_new_cb() {
    let mut cb: norcb::CbFlash<5, 266> = norcb::CbFlash::new();
    assert_eq!(cb.new_cb(1, 16, 4), Err(Error::NoFlash));
}
