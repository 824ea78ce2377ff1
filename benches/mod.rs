use criterion::{criterion_group, criterion_main};

mod network {
    pub mod application {
        pub mod http {
            pub mod response;
        }
    }
}

criterion_group!(
    benches,
    network::application::http::response::bench_fixed_length,
    network::application::http::response::bench_chunked,
    network::application::http::response::bench_iter_content
);
criterion_main!(benches);
