use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct S3Secrets {
    #[serde(rename = "endpoint")]
    pub endpoint: Option<String>,
    #[serde(rename = "region")]
    pub region: String,
    #[serde(rename = "accessKeyId")]
    pub access_key_id: String,
    #[serde(rename = "secretAccessKey")]
    pub secret_access_key: String,
    #[serde(rename = "bucketName")]
    pub bucket_name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Secrets {
    #[serde(rename = "serviceSecret")]
    pub service_secret: String,
    #[serde(rename = "contentPipelineApiKey")]
    pub content_pipeline_api_key: Option<String>,
    #[serde(rename = "s3Secrets")]
    pub s3_secrets: Option<S3Secrets>,
}
