#![cfg(feature = "rayon")]

use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use screenmatch::lowlevel::{
    scan_surface, scan_surface_par, NccScalar, ScanParams, SqDiffNormedScalar, TemplatePlan,
    ZnccScalar,
};
use screenmatch::{ImageView, MatchConfig, Matcher};

fn random_image(rng: &mut StdRng, width: usize, height: usize) -> Vec<u8> {
    (0..width * height).map(|_| rng.random_range(0..=255)).collect()
}

#[test]
fn parallel_surfaces_are_bit_identical() {
    let mut rng = StdRng::seed_from_u64(42);
    let (img_width, img_height) = (64, 48);
    let image = random_image(&mut rng, img_width, img_height);
    let tpl = random_image(&mut rng, 9, 7);
    let image_view = ImageView::from_slice(&image, img_width, img_height).unwrap();
    let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 9, 7).unwrap());
    let params = ScanParams::default();

    let seq = scan_surface::<ZnccScalar>(image_view, &plan, params).unwrap();
    let par = scan_surface_par::<ZnccScalar>(image_view, &plan, params).unwrap();
    assert_eq!(seq, par);

    let seq = scan_surface::<NccScalar>(image_view, &plan, params).unwrap();
    let par = scan_surface_par::<NccScalar>(image_view, &plan, params).unwrap();
    assert_eq!(seq, par);

    let seq = scan_surface::<SqDiffNormedScalar>(image_view, &plan, params).unwrap();
    let par = scan_surface_par::<SqDiffNormedScalar>(image_view, &plan, params).unwrap();
    assert_eq!(seq, par);
}

#[test]
fn parallel_search_matches_sequential() {
    let mut rng = StdRng::seed_from_u64(3);
    let target = RgbImage::from_fn(20, 16, |x, y| {
        let v = if (x / 4 * 3 + y / 4 * 5) % 7 < 3 { 210 } else { 35 };
        Rgb([v, v, v])
    });
    let mut source = RgbImage::from_fn(96, 72, |_, _| {
        let v: u8 = rng.random_range(0..=30);
        Rgb([v, v, v])
    });
    for (x, y, pixel) in target.enumerate_pixels() {
        source.put_pixel(50 + x, 30 + y, *pixel);
    }

    let seq = Matcher::new(MatchConfig::default())
        .find_matches(&source, &target)
        .unwrap();
    let par = Matcher::new(MatchConfig {
        parallel: true,
        ..MatchConfig::default()
    })
    .find_matches(&source, &target)
    .unwrap();
    assert_eq!(seq, par);
}
