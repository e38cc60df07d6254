use criterion::{black_box, criterion_group, criterion_main, Criterion};
use page_archiver::{Category, HttpResponse, ResourceStore, ResponseClassifier, UrlResolver};
use tempfile::tempdir;

fn bench_url_resolution(c: &mut Criterion) {
    let resolver = UrlResolver::new("https://example.com/subdir/page.html");
    let test_urls = vec![
        "../style.css",
        "./script.js",
        "images/photo.jpg",
        "https://cdn.example.com/style.css",
        "//cdn.example.com/script.js",
        "../../../assets/logo.png",
        "./nested/path/file.css",
    ];

    c.bench_function("resolve_urls", |b| {
        b.iter(|| {
            for url in &test_urls {
                let _resolved = resolver.resolve(black_box(url));
            }
        });
    });
}

fn bench_filename_derivation(c: &mut Criterion) {
    let test_urls = vec![
        "https://example.com/assets/app.js?v=1.2.3",
        "https://example.com/style.css",
        "https://example.com/fonts/loader?family=Roboto",
        "https://example.com/images/photo%20with%20spaces.jpg",
        "https://example.com/deeply/nested/path/resource.woff2#frag",
    ];

    c.bench_function("derive_filenames", |b| {
        b.iter(|| {
            for url in &test_urls {
                let _name = UrlResolver::filename_for(black_box(url));
            }
        });
    });
}

fn bench_classification(c: &mut Criterion) {
    let classifier = ResponseClassifier::new();

    c.bench_function("classify_responses", |b| {
        b.iter(|| {
            for status in [200u16, 301, 404, 502, 503] {
                let mut response = HttpResponse::with_status(black_box(status));
                response.body = "upstream body".to_string();
                let _ = classifier.classify(response);
            }
        });
    });
}

fn bench_resource_store_writes(c: &mut Criterion) {
    let temp_dir = tempdir().unwrap();
    let mut store = ResourceStore::new(temp_dir.path());
    let content = b"This is test content for benchmarking resource persistence";

    c.bench_function("reserve_and_write", |b| {
        let mut n = 0u32;
        b.iter(|| {
            let url = format!("https://example.com/assets/file{}.css", n);
            n += 1;
            let local = store.reserve(black_box(&url), Category::Css).unwrap();
            store.write(&local, black_box(content)).unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_url_resolution,
    bench_filename_derivation,
    bench_classification,
    bench_resource_store_writes,
);
criterion_main!(benches);
