use byteorder::{LittleEndian, WriteBytesExt};
use splatsplit_data::{
    BuildOptions, CameraModelKind, PoseConvention, build_camera_config, read_sparse_model,
};
use std::fs;
use std::io::Write;
use std::path::Path;

const CAMERAS_TXT: &str = "\
# Camera list with one line of data per camera:
#   CAMERA_ID, MODEL, WIDTH, HEIGHT, PARAMS[]
1 PINHOLE 3840 2160 2900 2910 1920 1080
2 SIMPLE_PINHOLE 640 384 500 320 192
";

const IMAGES_TXT: &str = "\
# Image list with two lines of data per image:
#   IMAGE_ID, QW, QX, QY, QZ, TX, TY, TZ, CAMERA_ID, NAME
#   POINTS2D[] as (X, Y, POINT3D_ID)
1 0.7071067811865476 0 0.7071067811865476 0 1 2 3 1 002001.png
10.0 20.0 -1 30.0 40.0 7
2 1 0 0 0 0 0 4 2 001001.png

";

fn write_text_model(dir: &Path) {
    fs::write(dir.join("cameras.txt"), CAMERAS_TXT).unwrap();
    fs::write(dir.join("images.txt"), IMAGES_TXT).unwrap();
}

fn write_binary_model(dir: &Path) {
    let mut cams = Vec::new();
    cams.write_u64::<LittleEndian>(2).unwrap();
    for (id, model, w, h, params) in [
        (1u32, 1i32, 3840u64, 2160u64, vec![2900.0, 2910.0, 1920.0, 1080.0]),
        (2, 0, 640, 384, vec![500.0, 320.0, 192.0]),
    ] {
        cams.write_u32::<LittleEndian>(id).unwrap();
        cams.write_i32::<LittleEndian>(model).unwrap();
        cams.write_u64::<LittleEndian>(w).unwrap();
        cams.write_u64::<LittleEndian>(h).unwrap();
        for p in params {
            cams.write_f64::<LittleEndian>(p).unwrap();
        }
    }
    fs::write(dir.join("cameras.bin"), cams).unwrap();

    let h = std::f64::consts::FRAC_1_SQRT_2;
    let mut images = Vec::new();
    images.write_u64::<LittleEndian>(2).unwrap();
    for (id, q, t, cam, name, points) in [
        (1u32, [h, 0.0, h, 0.0], [1.0, 2.0, 3.0], 1u32, "002001.png", 2u64),
        (2, [1.0, 0.0, 0.0, 0.0], [0.0, 0.0, 4.0], 2, "001001.png", 0),
    ] {
        images.write_u32::<LittleEndian>(id).unwrap();
        for v in q.iter().chain(t.iter()) {
            images.write_f64::<LittleEndian>(*v).unwrap();
        }
        images.write_u32::<LittleEndian>(cam).unwrap();
        images.write_all(name.as_bytes()).unwrap();
        images.write_u8(0).unwrap();
        images.write_u64::<LittleEndian>(points).unwrap();
        for _ in 0..points {
            images.write_f64::<LittleEndian>(1.0).unwrap();
            images.write_f64::<LittleEndian>(2.0).unwrap();
            images.write_i64::<LittleEndian>(-1).unwrap();
        }
    }
    fs::write(dir.join("images.bin"), images).unwrap();
}

#[test]
fn test_text_and_binary_models_agree() {
    let text_dir = tempfile::tempdir().unwrap();
    let bin_dir = tempfile::tempdir().unwrap();
    write_text_model(text_dir.path());
    write_binary_model(bin_dir.path());

    let text = read_sparse_model(text_dir.path()).unwrap();
    let binary = read_sparse_model(bin_dir.path()).unwrap();

    assert_eq!(text.cameras, binary.cameras);
    assert_eq!(text.images.len(), 2);
    for (id, image) in &text.images {
        let other = &binary.images[id];
        assert_eq!(image.name, other.name);
        assert_eq!(image.camera_id, other.camera_id);
        assert_eq!(image.tvec, other.tvec);
        for (a, b) in image.qvec.iter().zip(other.qvec) {
            assert!((a - b).abs() < 1e-12);
        }
    }
    assert_eq!(text.cameras[&2].kind, CameraModelKind::SimplePinhole);
}

#[test]
fn test_binary_is_preferred_over_text() {
    let dir = tempfile::tempdir().unwrap();
    write_binary_model(dir.path());
    // A broken text model next to the binary one must be ignored.
    fs::write(dir.path().join("cameras.txt"), "1 OPENCV 1 1 1 1 1 1 0 0 0 0\n").unwrap();
    fs::write(dir.path().join("images.txt"), "garbage\n").unwrap();

    let model = read_sparse_model(dir.path()).unwrap();
    assert_eq!(model.cameras.len(), 2);
}

#[test]
fn test_config_from_model_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    write_text_model(dir.path());
    fs::create_dir_all(dir.path().join("masks/001001")).unwrap();

    let model = read_sparse_model(dir.path()).unwrap();
    let options = BuildOptions {
        masks_root: Some(dir.path().join("masks")),
        ..Default::default()
    };
    let config = build_camera_config(&model, &options).unwrap();

    assert_eq!(config.cameras.len(), 2);
    let first = &config.cameras[0];
    assert_eq!(first.mask_folder, "001001");
    assert_eq!((first.width, first.height), (640, 384));
    assert_eq!(first.k, [[500.0, 0.0, 320.0], [0.0, 500.0, 192.0], [0.0, 0.0, 1.0]]);
    assert_eq!(first.convention, PoseConvention::WorldToCamera);

    // 90 degrees about y: the x axis maps to -z.
    let second = &config.cameras[1];
    assert_eq!(second.mask_folder, "002001");
    assert!((second.r[2][0] + 1.0).abs() < 1e-12);
    assert!((second.r[0][2] - 1.0).abs() < 1e-12);
    assert_eq!(second.t, [1.0, 2.0, 3.0]);

    let cameras = config.camera_models().unwrap();
    assert_eq!(cameras[1].index(), 1);
}
