use hdrhistogram::Histogram;
use rand::{seq::SliceRandom, thread_rng};
use reqwest::Client;
use std::time::{Duration, Instant};

pub async fn run(url: &str, clients: usize, total: usize) -> anyhow::Result<()> {
    let clients = clients.max(1);
    let questions = vec![
        "How are you today?",
        "Tell me a joke.",
        "What is the capital of France?",
        "Summarize the plot of Hamlet in one sentence.",
        "Give me three synonyms for happy.",
        "What should I cook tonight?",
    ];

    let client = Client::builder().pool_idle_timeout(Duration::from_secs(10)).build()?;
    let mut hist = Histogram::<u64>::new(3)?;
    let mut errors = 0usize;

    let start = Instant::now();
    let mut tasks = vec![];
    for _ in 0..clients {
        let client = client.clone();
        let url = url.to_string();
        let questions = questions.clone();
        tasks.push(tokio::spawn(async move {
            let mut latencies = vec![];
            let mut errs = 0;
            for _ in 0..(total / clients) {
                let q = {
                    let mut rng = thread_rng();
                    questions.choose(&mut rng).copied().unwrap_or("Hello")
                };
                let body = serde_json::json!({
                    "messages": [{"role": "user", "content": q}],
                    "max_tokens": 64
                });
                let t0 = Instant::now();
                let res = client.post(&url).json(&body).send().await;
                let dur = t0.elapsed();
                match res {
                    Ok(r) if r.status().is_success() => latencies.push(dur),
                    _ => errs += 1,
                }
            }
            (latencies, errs)
        }));
    }

    for t in tasks {
        let (ls, e) = t.await?;
        for d in ls {
            hist.record(d.as_millis() as u64).ok();
        }
        errors += e;
    }

    println!("ran {} reqs in {:?}", total, start.elapsed());
    println!("errors: {}", errors);
    println!("p50: {} ms", hist.value_at_quantile(0.50));
    println!("p95: {} ms", hist.value_at_quantile(0.95));
    println!("p99: {} ms", hist.value_at_quantile(0.99));
    Ok(())
}
