use protomap::{Kmeans, Kohonen, PrefetchModel};
use rand::prelude::*;
use tracing_subscriber::EnvFilter;

/// Clients drawn from a few browsing profiles: each profile favors its own
/// block of pages, with some noise.
fn sessions(rng: &mut StdRng, clients: usize, pages: usize, profiles: usize) -> Vec<Vec<f32>> {
    let block = pages / profiles;
    (0..clients)
        .map(|c| {
            let profile = c % profiles;
            (0..pages)
                .map(|p| {
                    let p_visit = if p / block == profile { 0.8 } else { 0.05 };
                    f32::from(u8::from(rng.random_bool(p_visit)))
                })
                .collect()
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let (clients, pages, profiles) = (60, 24, 3);
    let mut rng = StdRng::seed_from_u64(2024);
    let train = sessions(&mut rng, clients, pages, profiles);
    let test = sessions(&mut rng, clients, pages, profiles);

    let mut kmeans = Kmeans::new(profiles).with_seed(7).initialize(pages, &train, &test)?;
    let report = kmeans.train()?;
    println!("k-means: {report:?}");
    print!("{}", kmeans.store().describe_members());
    for threshold in [0.3, 0.5, 0.7] {
        kmeans.set_prefetch_threshold(threshold)?;
        println!("{}\n", kmeans.test()?);
    }

    let mut som = Kohonen::new(3, 40).with_seed(7).initialize(pages, &train, &test)?;
    let report = som.train()?;
    println!("som: {report:?}");
    print!("{}", som.store().describe_prototypes());
    println!("{}", som.test()?);

    Ok(())
}
