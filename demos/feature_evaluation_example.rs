use featbench::{distance, metrics, Matrix, PCA, TSNE};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Feature Representation Evaluation ===\n");

    // Synthetic stand-in for a feature extractor: 3 classes, 20 items each,
    // 32-wide vectors clustered around per-class centers.
    let n_classes = 3;
    let per_class = 20;
    let n_features = 32;
    let (features, labels) = synthetic_features(n_classes, per_class, n_features, 7);

    println!(
        "Dataset: {} samples, {} features, {} classes\n",
        features.nrows(),
        n_features,
        n_classes
    );

    println!("=== Leave-One-Out Nearest-Neighbor Accuracy ===");
    let dist = distance::pairwise_distances(&features)?;
    let raw_accuracy = metrics::nearest_neighbor_accuracy(&dist, &labels)?;
    println!("{:<24} {:>10.4}", "raw features", raw_accuracy);

    // Sweep the number of kept components to see how much the representation
    // can be compressed before retrieval quality drops.
    for &k in &[2, 4, 8, 16] {
        let mut pca = PCA::new().n_components(k);
        let reduced = pca.fit_transform(&features)?;
        let dist = distance::pairwise_distances(&reduced)?;
        let accuracy = metrics::nearest_neighbor_accuracy(&dist, &labels)?;
        let explained: f32 = pca.explained_variance_ratio.as_ref().map(|r| r.sum()).unwrap_or(0.0);
        println!(
            "{:<24} {:>10.4}   (explained variance {:.4})",
            format!("PCA({} components)", k),
            accuracy,
            explained
        );
    }

    println!("\n=== 2-D Embedding for Inspection ===");
    let mut pca = PCA::new().n_components(8);
    let reduced = pca.fit_transform(&features)?;

    let mut tsne = TSNE::new().perplexity(10.0).n_iter(500).random_state(7);
    let points = tsne.fit_transform(&reduced)?;
    println!("Embedded {} points into 2-D", points.nrows());
    if let Some(kl) = tsne.kl_divergence {
        println!("Final KL divergence: {:.4}", kl);
    }

    let (min_x, max_x) = column_range(&points, 0);
    let (min_y, max_y) = column_range(&points, 1);
    println!("Layout extent: x in [{:.2}, {:.2}], y in [{:.2}, {:.2}]", min_x, max_x, min_y, max_y);

    println!("\nFirst point per class:");
    for c in 0..n_classes {
        let i = c * per_class;
        println!("  class {}: ({:.3}, {:.3})", c, points[[i, 0]], points[[i, 1]]);
    }

    Ok(())
}

fn synthetic_features(
    n_classes: usize,
    per_class: usize,
    n_features: usize,
    seed: u64,
) -> (Matrix, Vec<i32>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = n_classes * per_class;
    let mut features = Matrix::zeros((n, n_features));
    let mut labels = Vec::with_capacity(n);

    for c in 0..n_classes {
        for i in 0..per_class {
            let row = c * per_class + i;
            for j in 0..n_features {
                // Class centers sit far apart relative to the noise.
                let center = (c as f32 + 1.0) * 10.0 * ((j % (c + 2)) as f32 + 1.0);
                features[[row, j]] = center + rng.gen_range(-1.0..1.0);
            }
            labels.push(c as i32);
        }
    }

    (features, labels)
}

fn column_range(points: &Matrix, column: usize) -> (f32, f32) {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &v in points.column(column).iter() {
        min = min.min(v);
        max = max.max(v);
    }
    (min, max)
}
