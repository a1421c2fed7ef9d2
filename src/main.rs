use config::WatchdogConfig;
use docker::DockerRuntime;
use notify::Notifier;
use scheduler::PollScheduler;

mod config;
mod docker;
mod engine;
mod health;
mod notify;
mod scheduler;
mod signals;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = WatchdogConfig::from_env();

    // The connectivity check is the only fatal error in the daemon's life;
    // once polling starts, runtime hiccups are logged and skipped.
    let runtime = match DockerRuntime::connect().await {
        Ok(runtime) => {
            log::info!("Connection to Docker socket OK");
            runtime
        }
        Err(err) => {
            log::error!(
                "Cannot connect to Docker daemon, make sure /var/run/docker.sock is usable for the watchdog: {err}"
            );
            std::process::exit(1);
        }
    };

    signals::handle_termination();
    let _ = sd_notify::notify(true, &[sd_notify::NotifyState::Ready]);

    let notifier = Notifier::from_config(&config);
    PollScheduler::new(&config, runtime, notifier).run().await;
}
