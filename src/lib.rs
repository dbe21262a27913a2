#![doc = r#"
garmentprep: background removal and canvas standardization for garment photos.

This crate turns front/back/side garment photographs into standardized
transparent-canvas PNGs for downstream 3D visualization. Backgrounds are
removed by a remote service when a credential is configured, with a native
GrabCut segmentation as the fallback; the cutout is then scaled to fit,
centered on a transparent square, padded and resized to a fixed side.
It powers the `garmentprep` CLI and can be embedded in your own Rust
applications.

Stability
---------
The public library API is experimental in initial releases and may evolve.

Add dependency
--------------
```toml
[dependencies]
garmentprep = "0.1"
```

Quick start: process one file
-----------------------------
```rust,no_run
use std::path::Path;
use garmentprep::{build_segmenter, process_image_path, PipelineParams};

fn main() -> garmentprep::Result<()> {
    let params = PipelineParams::default();
    let segmenter = build_segmenter(&params)?;

    let processed = process_image_path(Path::new("/photos/shirt_front.jpg"), &segmenter, &params)?;
    println!(
        "{} -> {} via {}",
        processed.name, processed.filename, processed.source
    );
    garmentprep::write_png(Path::new("/out/front.png"), &processed.image)
}
```

Remote background removal
-------------------------
The credential is always passed explicitly; the library never reads the
environment.

```rust,no_run
use garmentprep::{build_segmenter, PipelineParams, SegmenterConfig};

fn main() -> garmentprep::Result<()> {
    let params = PipelineParams {
        remote: SegmenterConfig::with_api_key("my-remove-bg-key"),
        ..PipelineParams::default()
    };
    // Remote first, local GrabCut whenever the remote call fails
    let _segmenter = build_segmenter(&params)?;
    Ok(())
}
```

Batch helpers
-------------
```rust,no_run
use std::path::{Path, PathBuf};
use garmentprep::{build_segmenter, process_paths_to_dir, PipelineParams};

fn main() -> garmentprep::Result<()> {
    let params = PipelineParams { workers: 8, ..PipelineParams::default() };
    let segmenter = build_segmenter(&params)?;
    let inputs = vec![
        PathBuf::from("/photos/shirt_front.jpg"),
        PathBuf::from("/photos/shirt_back.jpg"),
    ];

    let report = process_paths_to_dir(&inputs, Path::new("/out"), &segmenter, &params)?;
    println!("processed={} errors={}", report.processed, report.errors);
    Ok(())
}
```

Sessions
--------
```rust,no_run
use garmentprep::{build_segmenter, process_session, InputImage, PipelineParams, SessionStore};

fn main() -> garmentprep::Result<()> {
    let params = PipelineParams::default();
    let segmenter = build_segmenter(&params)?;
    let store = SessionStore::new("/srv/data");
    let uploads = vec![InputImage::new("shirt_front.png", std::fs::read("shirt_front.png")?)];

    let report = process_session(&store, &uploads, &segmenter, &params)?;
    for stored in &report.results {
        println!("{} -> {}", stored.result.role, stored.url);
    }
    Ok(())
}
```

Error handling
--------------
All public functions return `garmentprep::Result<T>`. Segmentation problems never
surface as errors: a failed remote call falls back to local segmentation and a
failed local run keeps the whole image (`SegmentationSource::Passthrough`).

```rust,no_run
use garmentprep::{build_segmenter, process_image_bytes, Error, PipelineParams};

fn main() -> garmentprep::Result<()> {
    let params = PipelineParams::default();
    let segmenter = build_segmenter(&params)?;
    match process_image_bytes("notes.txt", b"not an image", &segmenter, &params) {
        Ok(img) => println!("{}", img.filename),
        Err(Error::Decode { name, source }) => eprintln!("cannot decode {name}: {source}"),
        Err(other) => eprintln!("Other error: {other}"),
    }
    Ok(())
}
```

Useful modules
--------------
- [`api`]: high-level, ergonomic entry points.
- [`core`]: canvas standardization, role handling, segmentation tiers.
- [`io`]: decoding, PNG writing and session storage.
- [`types`]: `Role`, `SegmentationSource`, `ProcessedResult`.
- [`error`]: crate-level `Error` and `Result`.
"#]

// Core modules (public)
pub mod api;
pub mod core;
pub mod error;
pub mod io;
pub mod types;

// Curated public API surface
// Types
pub use crate::core::params::{PipelineParams, SegmenterConfig};
pub use error::{Error, Result};
pub use types::{ProcessedResult, Role, SegmentationSource};

// Building blocks
pub use crate::core::processing::canvas::{standardize, standardize_with};
pub use crate::core::processing::role::{dedup_by_role, guess_role};
pub use crate::core::segmentation::{
    BackgroundRemovalService, Cutout, FallbackSegmenter, LocalSegmenter, RemoteSegmenter,
    RemoveBgClient, Segmenter, build_segmenter, segment_or_passthrough,
};

// I/O
pub use io::storage::{Session, SessionStore, StoredResult};
pub use io::writers::png::{encode_png, write_png};

// High-level API re-exports
pub use api::{
    BatchFailure, BatchReport, InputImage, ProcessedImage, SessionReport, process_batch,
    process_image_bytes, process_image_path, process_paths_to_dir, process_session,
};
