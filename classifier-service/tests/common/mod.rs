#![allow(dead_code)]

use classifier_service::config::{
    ClassifierConfig, CorsConfig, Environment, ModelConfig, RateLimitConfig, UploadConfig,
    DEFAULT_MAX_UPLOAD_BYTES,
};
use classifier_service::models::LabelSet;
use classifier_service::services::{Classifier, ImageModel};
use classifier_service::startup::{build_router, AppState, Application};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use service_core::axum::Router;
use service_core::config::Config as CoreConfig;
use std::io::Cursor;
use std::sync::Arc;
use tract_onnx::prelude::tract_ndarray::Array4;

pub const TEST_ORIGIN: &str = "http://frontend.test";
pub const TEST_LABELS: &str = "0 Cat\n1 Golden Retriever\n2 Parrot\n";

/// Model stub returning fixed scores for every input.
pub struct StubModel {
    pub scores: Vec<f32>,
}

impl ImageModel for StubModel {
    fn predict(&self, input: &Array4<f32>) -> anyhow::Result<Vec<f32>> {
        anyhow::ensure!(input.shape() == &[1, 224, 224, 3], "unexpected input shape");
        Ok(self.scores.clone())
    }
}

pub fn test_config() -> ClassifierConfig {
    ClassifierConfig {
        common: CoreConfig {
            port: 0, // Random port for testing
            log_level: "error".to_string(),
        },
        environment: Environment::Test,
        model: ModelConfig {
            model_path: "does-not-exist.onnx".to_string(),
            labels_path: "does-not-exist.txt".to_string(),
        },
        cors: CorsConfig {
            frontend_url: TEST_ORIGIN.to_string(),
        },
        upload: UploadConfig {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        },
        rate_limit: RateLimitConfig { per_minute: 0 },
        otlp_endpoint: None,
    }
}

pub fn stub_classifier(scores: Vec<f32>) -> Classifier {
    Classifier::new(Arc::new(StubModel { scores }), LabelSet::parse(TEST_LABELS))
        .expect("Failed to build stub classifier")
}

/// Router backed by a stub model, for `oneshot` tests.
pub fn test_router(classifier: Option<Classifier>) -> Router {
    build_router(AppState {
        config: test_config(),
        classifier: classifier.map(Arc::new),
    })
}

pub fn encode_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut buf), format)
        .expect("Failed to encode test image");
    buf
}

pub fn png_bytes() -> Vec<u8> {
    encode_image(320, 240, ImageFormat::Png)
}

pub fn jpeg_bytes() -> Vec<u8> {
    encode_image(240, 320, ImageFormat::Jpeg)
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
}

impl TestApp {
    /// Spawn the server with a stub classifier scoring `[0.05, 0.9, 0.05]`.
    pub async fn spawn() -> Self {
        Self::spawn_with(test_config(), Some(stub_classifier(vec![0.05, 0.9, 0.05]))).await
    }

    /// Spawn the server as it runs after a failed model load.
    pub async fn spawn_without_model() -> Self {
        Self::spawn_with(test_config(), None).await
    }

    pub async fn spawn_with(config: ClassifierConfig, classifier: Option<Classifier>) -> Self {
        let app = Application::build_with_classifier(config, classifier)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            client,
        }
    }

    pub async fn classify(&self, form: reqwest::multipart::Form) -> reqwest::Response {
        self.client
            .post(format!("{}/api/classify", self.address))
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request")
    }
}

pub fn image_form(bytes: Vec<u8>, file_name: &str) -> reqwest::multipart::Form {
    reqwest::multipart::Form::new().part(
        "image",
        reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string()),
    )
}
