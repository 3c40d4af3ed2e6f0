//! Paint-to-presentation pipeline: conversion, buffer merging, and the
//! composited end result.

use std::sync::Arc;
use std::time::{Duration, Instant};

use glaze::{
    Ball, BrowserView, Compositor, CompositorOpts, Extent, GlazeResult, PixelRect, PointerButton,
    Rgba8, SurfaceBuffer, WebEngine, pixel,
};

struct QuietEngine;

impl WebEngine for QuietEngine {
    fn load(&self, _location: &str) -> GlazeResult<()> {
        Ok(())
    }
    fn send_pointer_move(&self, _x: i32, _y: i32) {}
    fn send_pointer_button(&self, _b: PointerButton, _x: i32, _y: i32, _pressed: bool) {}
    fn send_key(&self, _code: u32, _pressed: bool) {}
    fn pump_work(&self) {}
    fn close(&self) {}
}

fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn converter_applies_the_documented_permutation() {
    let src: Vec<u8> = (0u8..64).collect();
    let out = pixel::bgra_to_rgba(&src, 16);
    assert_eq!(out.len(), src.len());
    for i in 0..16 {
        assert_eq!(out[i * 4], src[i * 4 + 3]);
        assert_eq!(out[i * 4 + 1], src[i * 4]);
        assert_eq!(out[i * 4 + 2], src[i * 4 + 1]);
        assert_eq!(out[i * 4 + 3], src[i * 4 + 2]);
    }
}

#[test]
fn region_write_then_snapshot_is_exact() {
    let extent = Extent::new(6, 5).unwrap();
    let buffer = SurfaceBuffer::new(extent).unwrap();
    let region = PixelRect::new(1, 1, 3, 2);
    let pixels: Vec<u8> = (0u8..24).collect();
    buffer.write_region(region, &pixels).unwrap();

    let snap = buffer.snapshot();
    for row in 0..2usize {
        for col in 0..3usize {
            let dst = ((1 + row) * 6 + 1 + col) * 4;
            let src = (row * 3 + col) * 4;
            assert_eq!(&snap[dst..dst + 4], &pixels[src..src + 4]);
        }
    }
    // a pixel outside the region stays zero
    assert_eq!(&snap[0..4], &[0, 0, 0, 0]);
}

#[test]
fn paint_update_reaches_the_presented_frame() {
    // red background, non-transparent; a full-frame all-zero engine paint
    // must come out as (0,0,0,0) in the presented frame
    let extent = Extent::new(8, 8).unwrap();
    let buffer = Arc::new(SurfaceBuffer::new(extent).unwrap());
    let view = BrowserView::new(Arc::clone(&buffer));

    let opts = CompositorOpts {
        fps: 30,
        background: Rgba8::opaque(255, 0, 0),
        transparent: false,
        ..CompositorOpts::default()
    };
    let compositor = Compositor::new(extent, opts, buffer, Arc::new(QuietEngine)).unwrap();
    let viewer = compositor.viewer();
    let close = compositor.close_handle();
    let worker = std::thread::spawn(move || compositor.run());

    let zeros = vec![0u8; extent.byte_len()];
    view.on_paint(&[PixelRect::of(extent)], &zeros, 8, 8)
        .unwrap();

    // construction presents one black frame; wait for a real redraw
    assert!(wait_until(Duration::from_secs(3), || viewer.presented_frames() >= 2));
    close.close();
    worker.join().unwrap().unwrap();

    assert_eq!(viewer.pixel(3, 3), Some([0, 0, 0, 0]));
    assert_eq!(viewer.pixel(0, 7), Some([0, 0, 0, 0]));
}

#[test]
fn opaque_engine_frame_overwrites_the_background() {
    let extent = Extent::new(4, 4).unwrap();
    let buffer = Arc::new(SurfaceBuffer::new(extent).unwrap());
    let view = BrowserView::new(Arc::clone(&buffer));

    let opts = CompositorOpts {
        fps: 30,
        background: Rgba8::opaque(255, 0, 0),
        ..CompositorOpts::default()
    };
    let compositor = Compositor::new(extent, opts, buffer, Arc::new(QuietEngine)).unwrap();
    let viewer = compositor.viewer();
    let close = compositor.close_handle();
    let worker = std::thread::spawn(move || compositor.run());

    // engine-order bytes chosen so the presented pixel is opaque blue
    let px = [0u8, 255, 255, 0]; // permutes to (0, 0, 255, 255)
    let mut frame = Vec::with_capacity(extent.byte_len());
    for _ in 0..extent.pixel_count() {
        frame.extend_from_slice(&px);
    }
    view.on_paint(&[PixelRect::of(extent)], &frame, 4, 4)
        .unwrap();

    assert!(wait_until(Duration::from_secs(3), || viewer.presented_frames() >= 2));
    close.close();
    worker.join().unwrap().unwrap();

    assert_eq!(viewer.pixel(2, 2), Some([0, 0, 255, 255]));
}

#[test]
fn transparent_mode_shows_local_layers_through_the_browser() {
    let extent = Extent::new(32, 32).unwrap();
    let buffer = Arc::new(SurfaceBuffer::new(extent).unwrap());

    let opts = CompositorOpts {
        fps: 30,
        transparent: true,
        ..CompositorOpts::default()
    };
    let mut compositor =
        Compositor::new(extent, opts, Arc::clone(&buffer), Arc::new(QuietEngine)).unwrap();
    // stationary ball dead center; the all-transparent browser buffer
    // must not cover it
    compositor.add_layer(Box::new(Ball::new(
        16.0,
        16.0,
        8.0,
        0.0,
        0.0,
        Rgba8::opaque(0, 0, 255),
    )));

    let viewer = compositor.viewer();
    let close = compositor.close_handle();
    let worker = std::thread::spawn(move || compositor.run());

    assert!(wait_until(Duration::from_secs(3), || viewer.presented_frames() >= 2));
    close.close();
    worker.join().unwrap().unwrap();

    assert_eq!(viewer.pixel(16, 16), Some([0, 0, 255, 255]));
    assert_eq!(viewer.pixel(0, 0), Some([0, 0, 0, 0]));
}
