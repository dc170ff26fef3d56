use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pdf_oxide::text::{detect_word_boundaries, BoundaryContext, CharacterInfo};

fn make_characters(text: &str, font_size: f32) -> Vec<CharacterInfo> {
    let mut x = 0.0;
    text.chars()
        .map(|c| {
            let width = font_size * 0.5;
            let info = CharacterInfo {
                code: c as u32,
                glyph_id: None,
                width,
                x_position: x,
                tj_offset: None,
                font_size,
                is_ligature: false,
                original_ligature: None,
                protected_from_split: false,
            };
            x += width;
            info
        })
        .collect()
}

fn bench_latin_paragraph(c: &mut Criterion) {
    let text = "The quick brown fox jumps over the lazy dog. ".repeat(20);
    let characters = make_characters(&text, 12.0);
    let context = BoundaryContext::new(12.0);

    c.bench_function("word_boundary_latin_paragraph", |b| {
        b.iter(|| detect_word_boundaries(black_box(&characters), black_box(&context)))
    });
}

fn bench_cjk_paragraph(c: &mut Criterion) {
    let text = "\u{6587}\u{5b57}\u{5217}\u{306e}\u{5883}\u{754c}\u{691c}\u{51fa}".repeat(20);
    let characters = make_characters(&text, 12.0);
    let context = BoundaryContext::new(12.0);

    c.bench_function("word_boundary_cjk_paragraph", |b| {
        b.iter(|| detect_word_boundaries(black_box(&characters), black_box(&context)))
    });
}

criterion_group!(benches, bench_latin_paragraph, bench_cjk_paragraph);
criterion_main!(benches);
