// Control API adapter integration tests (feature-gated).
#![allow(missing_docs)]

#[cfg(feature = "pinecone")]
mod pinecone {
    use index_provisioner_adapters::pinecone::{PineconeControlClient, PineconeControlConfig};
    use index_provisioner_ports::{
        CreateIndexRequest, DistanceMetric, IndexControlPort, IndexName, MetadataConfig, PodType,
        SnapshotName, UpdateIndexRequest,
    };
    use index_provisioner_shared::{ErrorCode, ErrorEnvelope, RequestContext, Result, SecretString};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> Result<PineconeControlClient> {
        PineconeControlClient::new(PineconeControlConfig {
            api_key: SecretString::new("pc-example"), // pragma: allowlist secret
            environment: "us-east1-gcp".into(),
            base_url: Some(server.uri().into()),
            timeout_ms: 5_000,
        })
    }

    fn name(raw: &str) -> Result<IndexName> {
        Ok(IndexName::parse(raw)?)
    }

    fn pod_type(raw: &str) -> Result<PodType> {
        PodType::parse(raw).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                error.to_string(),
            )
        })
    }

    #[tokio::test]
    async fn create_index_posts_controller_body() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/databases"))
            .and(header("api-key", "pc-example"))
            .and(body_json(json!({
                "name": "stack1-abc-docs",
                "dimension": 1536,
                "metric": "cosine",
                "pods": 1,
                "replicas": 1,
                "pod_type": "s1.x1",
                "metadata_config": { "indexed": ["source"] }
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let request = CreateIndexRequest {
            name: name("stack1-abc-docs")?,
            dimension: 1536,
            metric: DistanceMetric::Cosine,
            pods: 1,
            replicas: 1,
            pod_type: pod_type("s1.x1")?,
            metadata_config: Some(MetadataConfig {
                field_names: vec!["source".to_owned()],
            }),
            source_collection: None,
        };
        client(&server)?
            .create_index(&RequestContext::new_pass(), request)
            .await
    }

    #[tokio::test]
    async fn update_index_patches_replicas_and_pod_type() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/databases/stack1-abc-docs"))
            .and(body_json(json!({ "replicas": 1, "pod_type": "s1.x2" })))
            .respond_with(ResponseTemplate::new(202).set_body_string("accepted"))
            .expect(1)
            .mount(&server)
            .await;

        let request = UpdateIndexRequest {
            name: name("stack1-abc-docs")?,
            replicas: 1,
            pod_type: pod_type("s1.x2")?,
        };
        client(&server)?
            .update_index(&RequestContext::new_pass(), request)
            .await
    }

    #[tokio::test]
    async fn describe_reads_pod_type_and_vector_count() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/databases/stack1-abc-docs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "database": {
                    "name": "stack1-abc-docs",
                    "dimension": 1536,
                    "metric": "cosine",
                    "pods": 1,
                    "replicas": 1,
                    "pod_type": "p1.x2"
                },
                "status": { "ready": true, "state": "Ready", "host": server.uri() }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/describe_index_stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "namespaces": {},
                "dimension": 1536,
                "totalVectorCount": 42
            })))
            .mount(&server)
            .await;

        let description = client(&server)?
            .describe_index(&RequestContext::new_pass(), name("stack1-abc-docs")?)
            .await?;
        assert_eq!(description.pod_type.as_ref(), "p1.x2");
        assert_eq!(description.vector_count, Some(42));
        Ok(())
    }

    #[tokio::test]
    async fn describe_without_stats_reports_unknown_count() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/databases/stack1-abc-docs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "database": { "name": "stack1-abc-docs", "pod_type": "s1.x1" },
                "status": { "ready": true, "host": server.uri() }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/describe_index_stats"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let description = client(&server)?
            .describe_index(&RequestContext::new_pass(), name("stack1-abc-docs")?)
            .await?;
        assert_eq!(description.vector_count, None);
        Ok(())
    }

    #[tokio::test]
    async fn describe_missing_index_maps_to_not_found() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/databases/gone"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let result = client(&server)?
            .describe_index(&RequestContext::new_pass(), name("gone")?)
            .await;
        let error = result.err().ok_or_else(|| {
            ErrorEnvelope::expected(
                ErrorCode::internal(),
                "expected describe to fail",
            )
        })?;
        assert_eq!(error.code, ErrorCode::new("controller", "index_not_found"));
        assert!(!error.is_retriable());
        Ok(())
    }

    #[tokio::test]
    async fn list_and_delete_round_trip_names() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/databases"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!(["stack1-abc-a", "other-b"])),
            )
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/databases/stack1-abc-a"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server)?;
        let ctx = RequestContext::new_pass();
        let names = client.list_indexes(&ctx).await?;
        assert_eq!(names, vec![name("stack1-abc-a")?, name("other-b")?]);
        client.delete_index(&ctx, name("stack1-abc-a")?).await
    }

    #[tokio::test]
    async fn snapshot_creates_collection_from_source() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections"))
            .and(body_json(json!({
                "name": "stack1-abc-a_snapshot",
                "source": "stack1-abc-a"
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let source = name("stack1-abc-a")?;
        client(&server)?
            .create_snapshot(
                &RequestContext::new_pass(),
                SnapshotName::for_index(&source),
                source,
            )
            .await
    }

    #[tokio::test]
    async fn unavailable_controller_is_retriable() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/databases"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let result = client(&server)?.list_indexes(&RequestContext::new_pass()).await;
        assert!(result.is_err_and(|error| error.is_retriable()));
        Ok(())
    }
}
