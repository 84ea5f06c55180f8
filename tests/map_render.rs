//! Engine-backed tests for map lifecycle, layer activation, and the render
//! pipeline. Requires a linked Mapnik installation with the csv input
//! plugin; fixtures live under `tests/fixtures/`.

use std::fs;

use mapnik::{AspectFixMode, Color, Datasource, Error, Layer, LayerStatus, Map, RenderOpts};

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"))
}

fn fixture_dir() -> String {
    format!("{}/tests/fixtures", env!("CARGO_MANIFEST_DIR"))
}

fn loaded_map() -> Map {
    mapnik::register_defaults().unwrap();
    let mut map = Map::new().unwrap();
    map.load(&fixture("map.xml")).unwrap();
    map
}

// ── Lifecycle ───────────────────────────────────────────────────────────

#[test]
fn renders_loaded_map_at_canvas_size() {
    let mut map = loaded_map();
    map.zoom_all().unwrap();

    let img = map.render_image(&RenderOpts::default()).unwrap();
    assert_eq!((img.width(), img.height()), (800, 600));
    assert_eq!(img.data().len(), 800 * 600 * 4);

    map.close();
    assert!(map.is_closed());
    map.close();
    assert!(map.is_closed(), "second close must stay a no-op");
}

#[test]
fn load_string_behaves_like_load() {
    mapnik::register_defaults().unwrap();
    let xml = fs::read_to_string(fixture("map.xml")).unwrap();

    let mut map = Map::new().unwrap();
    map.load_string(&xml, &fixture_dir()).unwrap();
    map.zoom_all().unwrap();

    let img = map.render_image(&RenderOpts::default()).unwrap();
    assert_eq!((img.width(), img.height()), (800, 600));
}

#[test]
fn missing_stylesheet_is_a_load_error() {
    mapnik::register_defaults().unwrap();
    let mut map = Map::new().unwrap();
    let err = map.load(&fixture("does_not_exist.xml")).unwrap_err();
    assert!(matches!(err, Error::Load(_)), "got {err:?}");
}

#[test]
fn malformed_stylesheet_is_a_load_error() {
    mapnik::register_defaults().unwrap();
    let mut map = Map::new().unwrap();
    let err = map.load_string("<Map><Unclosed></Map>", "").unwrap_err();
    assert!(matches!(err, Error::Load(_)), "got {err:?}");
}

#[test]
fn resize_changes_rendered_dimensions() {
    let mut map = loaded_map();
    map.resize(400, 300);
    map.zoom_all().unwrap();

    let img = map.render_image(&RenderOpts::default()).unwrap();
    assert_eq!((img.width(), img.height()), (400, 300));
}

#[test]
fn srs_defaults_to_wgs84_and_round_trips() {
    mapnik::register_defaults().unwrap();
    let mut map = Map::new().unwrap();
    assert_eq!(map.srs(), mapnik::map::DEFAULT_SRS);

    map.load(&fixture("map.xml")).unwrap();
    assert_eq!(map.srs(), "+init=epsg:4326");

    map.set_srs("+init=epsg:3857").unwrap();
    assert_eq!(map.srs(), "+init=epsg:3857");
}

#[test]
fn scale_denominator_meaningful_after_resize_and_zoom() {
    let mut map = loaded_map();
    map.resize(512, 512);
    map.zoom_to(-180.0, -90.0, 180.0, 90.0).unwrap();
    assert!(map.scale_denominator() > 0.0);
}

#[test]
fn max_extent_and_buffer_size_accept_values() {
    let mut map = loaded_map();
    map.set_buffer_size(128);
    map.set_max_extent(-180.0, -90.0, 180.0, 90.0);
    map.zoom_to(-180.0, -90.0, 180.0, 90.0).unwrap();
    map.reset_max_extent();
    map.render(&RenderOpts::default()).unwrap();
}

// ── Aspect fix mode ─────────────────────────────────────────────────────

#[test]
fn aspect_fix_mode_defaults_to_grow_bbox_and_round_trips() {
    mapnik::register_defaults().unwrap();
    let mut map = Map::new().unwrap();
    assert_eq!(map.aspect_fix_mode(), AspectFixMode::GrowBbox);

    map.set_aspect_fix_mode(AspectFixMode::Respect).unwrap();
    assert_eq!(map.aspect_fix_mode(), AspectFixMode::Respect);
}

// ── Background ──────────────────────────────────────────────────────────

#[test]
fn background_defaults_to_transparent_and_shows_in_output() {
    mapnik::register_defaults().unwrap();
    let mut map = Map::new().unwrap();
    assert_eq!(map.background(), Color::TRANSPARENT);

    let bg = Color::rgba(100, 50, 200, 150);
    map.set_background(bg);
    assert_eq!(map.background(), bg);

    // Pixel (0, 0) carries only the background; allow encoder rounding.
    let img = map.render_image(&RenderOpts::default()).unwrap();
    let [r, g, b, a] = img.pixel(0, 0);
    for (got, want) in [(r, bg.r), (g, bg.g), (b, bg.b), (a, bg.a)] {
        assert!(
            (got as i32 - want as i32).abs() <= 2,
            "background channel off: got {got}, want {want}"
        );
    }
}

// ── Render pipeline consistency ─────────────────────────────────────────

#[test]
fn buffer_and_file_renders_are_byte_identical() {
    let mut map = loaded_map();
    map.zoom_all().unwrap();
    let opts = RenderOpts { format: "png24".into(), ..Default::default() };

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.png");
    map.render_file(&opts, &path).unwrap();

    let from_file = fs::read(&path).unwrap();
    let from_buffer = map.render(&opts).unwrap();
    assert_eq!(from_buffer, from_file);

    let decoded = image::load_from_memory(&from_file).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (800, 600));
}

#[test]
fn raw_format_matches_decoded_image() {
    let mut map = loaded_map();
    map.zoom_all().unwrap();

    // Rendering reads map state without mutating it.
    let map = map;
    let raw = map
        .render(&RenderOpts { format: "raw".into(), ..Default::default() })
        .unwrap();
    let decoded = map.render_image(&RenderOpts::default()).unwrap();
    assert_eq!(raw, decoded.into_data());
}

#[test]
fn scale_override_is_per_render_and_leaves_map_state_alone() {
    let mut map = loaded_map();
    map.zoom_all().unwrap();
    let opts = RenderOpts { format: "png24".into(), ..Default::default() };

    let auto_scaled = map.render(&opts).unwrap();
    let denominator = map.scale_denominator();
    assert!(denominator > 0.0);

    map.render(&RenderOpts { scale: denominator * 4.0, ..opts.clone() }).unwrap();
    assert_eq!(
        map.scale_denominator(),
        denominator,
        "a per-render scale override must not mutate the map"
    );

    // Back at scale 0.0 the map renders as before the override.
    assert_eq!(map.render(&opts).unwrap(), auto_scaled);
}

#[test]
fn unknown_render_format_is_a_format_error_without_partial_file() {
    let mut map = loaded_map();
    map.zoom_all().unwrap();
    let opts = RenderOpts { format: "invalidformat".into(), ..Default::default() };

    let err = map.render(&opts).unwrap_err();
    assert!(matches!(err, Error::Format(_)), "got {err:?}");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.invalid");
    let err = map.render_file(&opts, &path).unwrap_err();
    assert!(matches!(err, Error::Format(_)), "got {err:?}");
    assert!(!path.exists(), "failed render must not leave a file behind");
}

// ── Layer activation state machine ──────────────────────────────────────

/// Baseline activation for the fixture. Engine majors before 3 report an
/// extra synthetic status-off layer entry; newer majors omit it.
fn baseline_status() -> Vec<bool> {
    let mut status = vec![true, true, true];
    if mapnik::version().major < 3 {
        status.push(false);
    }
    status
}

#[test]
fn select_layers_applies_policy_and_reset_restores_baseline() {
    let mut map = loaded_map();
    assert!(!map.has_stored_layer_status());
    assert_eq!(map.current_layer_status(), baseline_status());

    map.select_layers(&|name: &str| match name {
        "layerA" => LayerStatus::Exclude,
        "layerB" => LayerStatus::Include,
        _ => LayerStatus::Default,
    });

    let mut expected = baseline_status();
    expected[0] = false;
    assert_eq!(map.current_layer_status(), expected);
    assert!(map.has_stored_layer_status());

    map.reset_layers();
    assert!(!map.has_stored_layer_status());
    assert_eq!(map.current_layer_status(), baseline_status());

    // Reset without a snapshot stays a no-op.
    map.reset_layers();
    assert_eq!(map.current_layer_status(), baseline_status());
}

#[test]
fn second_snapshot_keeps_the_first_baseline() {
    let mut map = loaded_map();

    map.store_layer_status();
    map.set_layer_active(0, false);
    // Overlapping session: must not clobber the original baseline.
    map.store_layer_status();
    map.set_layer_active(1, false);

    map.reset_layers();
    assert_eq!(map.current_layer_status(), baseline_status());
}

#[test]
fn reset_is_refused_when_layer_count_grew_past_snapshot() {
    let mut map = loaded_map();
    map.store_layer_status();
    map.set_layer_active(0, false);

    // A layer added mid-session makes the live count exceed the snapshot.
    let ds = Datasource::new([
        ("type", "csv"),
        ("inline", "wkt,name\n\"POINT(5 5)\",late\n"),
    ])
    .unwrap();
    let mut layer = Layer::new("latecomer", "+init=epsg:4326").unwrap();
    layer.add_style("points").unwrap();
    layer.set_datasource(&ds);
    map.add_layer(&layer);

    let before = map.current_layer_status();
    map.reset_layers();
    assert!(
        map.has_stored_layer_status(),
        "refused restore must keep the snapshot"
    );
    assert_eq!(
        map.current_layer_status(),
        before,
        "refused restore must not touch any layer flags"
    );
    assert!(!map.layer_active(0));
}

// ── Datasource and layer handles ────────────────────────────────────────

#[test]
fn datasource_and_layer_construction_and_idempotent_close() {
    mapnik::register_defaults().unwrap();

    let mut ds = Datasource::new([
        ("type", "csv"),
        ("inline", "wkt,name\n\"POINT(0 0)\",origin\n"),
    ])
    .unwrap();

    let mut layer = Layer::new("tracks", "+init=epsg:4326").unwrap();
    layer.add_style("points").unwrap();
    layer.set_datasource(&ds);

    let mut map = Map::new().unwrap();
    map.add_layer(&layer);
    assert_eq!(map.layer_count(), 1);
    assert_eq!(map.layer_name(0), "tracks");
    assert!(map.layer_active(0));

    // Map copied the layer; both handles close independently and repeatedly.
    layer.close();
    layer.close();
    assert!(layer.is_closed());
    ds.close();
    ds.close();
    assert!(ds.is_closed());

    map.zoom_all().unwrap();
}

#[test]
fn rejected_datasource_parameters_produce_no_handle() {
    mapnik::register_defaults().unwrap();
    let err = Datasource::new([("type", "no-such-plugin")]).unwrap_err();
    assert!(matches!(err, Error::Construction(_)), "got {err:?}");
}
