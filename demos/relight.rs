// Precomputes transfer for a ground plane with a sphere floating above it, relights it under a
// disk light and writes the plane's vertex colors as an image. Every plane vertex becomes one
// pixel. Run with RUST_LOG=info to see the timings.
use glam::{Mat4, Vec3};
use prt::{
    light::{LightParams, LightShape},
    mesh::Mesh,
    scene::{Scene, SceneObject},
    transfer::TransferHooks,
    PrtConfig, PrtEngine, RgbF, Vec3d,
};

const PLANE_SEGMENTS: u32 = 127;

// I have no idea what the parameters of png mean, but i guess this works for now
fn save_image(path: &std::path::Path, buffer: &[u8], width: u32, height: u32) {
    let file = std::fs::File::create(path).unwrap();
    let mut writer = std::io::BufWriter::new(file);

    let mut encoder = png::Encoder::new(&mut writer, width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_source_gamma(png::ScaledFloat::new(1.0 / 2.2));

    let mut writer = encoder.write_header().unwrap();
    writer.write_image_data(buffer).unwrap();
}

fn main() {
    env_logger::init();

    let mut sphere = Mesh::uv_sphere(1.0, 24, 48);
    sphere.transform(Mat4::from_translation(Vec3::new(0.0, 0.0, 1.5)));
    let scene = Scene::new(vec![
        SceneObject::new(Mesh::plane(10.0, PLANE_SEGMENTS), RgbF::new(0.9, 0.9, 0.85)),
        SceneObject::new(sphere, RgbF::new(0.8, 0.3, 0.1)),
    ]);

    let config = PrtConfig {
        sample_count: 256,
        seed: Some(42),
        ..PrtConfig::default()
    };
    let mut engine = PrtEngine::new(config, scene).unwrap();

    #[cfg(feature = "json-cache")]
    let store = prt::cache::JsonCacheStore::new("relight-cache.json");
    #[cfg(feature = "json-cache")]
    let loaded = engine.load_cache(&store);
    #[cfg(not(feature = "json-cache"))]
    let loaded = false;

    if !loaded {
        let hooks = TransferHooks::new().with_progress(|p| {
            if p.completed == p.total {
                println!("Mesh {} finished ({} vertices).", p.mesh, p.total);
            }
        });
        engine.precompute(&hooks).unwrap();
        #[cfg(feature = "json-cache")]
        {
            if !engine.save_cache(&store) {
                println!("Transfer cache was not saved.");
            }
        }
    }

    engine
        .update_light(LightParams {
            shape: LightShape::Disk {
                radius: 1.0,
                distance: 3.5,
            },
            direction: Vec3d::new(0.5, -0.3, 1.0),
            intensity: 2.0,
        })
        .unwrap();

    let colors = engine.shade_mesh(0).unwrap();
    let image: Vec<u8> = colors
        .iter()
        .flat_map(|c| c.to_array())
        .map(|v| (v * 255.0).clamp(0.0, 255.0).floor() as u8)
        .collect();

    let side = PLANE_SEGMENTS + 1;
    save_image(std::path::Path::new("relight.png"), &image, side, side);
}
