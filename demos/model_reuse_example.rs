use featbench::{distance, io, metrics, Matrix, PCA};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Batch File Workflow ===\n");

    let dir = tempfile::tempdir()?;
    let features_path = dir.path().join("features-raw.dat");
    let reduced_path = dir.path().join("features-pca.dat");
    let model_path = dir.path().join("pca.dat");
    let filelists_path = dir.path().join("filelists.txt");

    // A producer process would write these; synthesize them here.
    let n_features = 16;
    let (features, labels) = synthetic_features(2, 10, n_features, 99);
    io::write_matrix(&features_path, &features)?;

    let filelists: String = labels
        .iter()
        .enumerate()
        .map(|(i, label)| format!("images/{:04}.png\t{}\n", i, label))
        .collect();
    std::fs::write(&filelists_path, filelists)?;
    println!("Wrote {} rows of width {} plus a label list", features.nrows(), n_features);

    // Fit, project, and persist the model for later consumers.
    let loaded = io::read_matrix(&features_path, n_features)?;
    let mut pca = PCA::new().n_components(4);
    let reduced = pca.fit_transform(&loaded)?;
    io::write_matrix(&reduced_path, &reduced)?;
    pca.save(&model_path)?;
    println!("Saved a {}-component model to {:?}", 4, model_path);

    // A separate process reconstructs the model from its binary layout and
    // must produce the same projection.
    let reloaded = PCA::load(&model_path, n_features)?;
    let reprojected = reloaded.transform(&loaded)?;
    let max_gap = (&reduced - &reprojected)
        .mapv(f32::abs)
        .into_iter()
        .fold(0.0, f32::max);
    println!("Max projection gap after reload: {:.2e}", max_gap);

    // Score the reduced representation straight from the files on disk.
    let reduced_from_disk = io::read_matrix(&reduced_path, 4)?;
    let file_labels = io::read_labels(&filelists_path)?;
    let dist = distance::pairwise_distances(&reduced_from_disk)?;
    let accuracy = metrics::nearest_neighbor_accuracy(&dist, &file_labels)?;
    println!("Accuracy from on-disk artifacts: {:.4}", accuracy);

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
                let center = (c as f32) * 25.0 + (j as f32);
                features[[row, j]] = center + rng.gen_range(-0.5..0.5);
            }
            labels.push(c as i32);
        }
    }

    (features, labels)
}
