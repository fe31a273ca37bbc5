use dotenvy::dotenv;

fn main() {
  // Tell Cargo that if the env file changes, to rerun this build script.
  println!("cargo::rerun-if-changed=.env");
  println!("cargo::rerun-if-env-changed=API_BASE_URL");
  println!("cargo::rerun-if-env-changed=REFRESH_SECS");

  // both keys are optional; the app falls back to the page origin and a 60s refresh
  dotenv().ok();

  if let Ok(url) = std::env::var("API_BASE_URL") {
    println!("cargo::rustc-env=API_BASE_URL={}", url);
  }

  if let Ok(secs) = std::env::var("REFRESH_SECS") {
    if secs.trim().parse::<u64>().is_err() {
      panic!("REFRESH_SECS must be a whole number of seconds, got {:?}", secs);
    }
    println!("cargo::rustc-env=REFRESH_SECS={}", secs.trim());
  }
}
