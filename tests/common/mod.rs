//! Shared helpers for the integration suites
//!
//! `MockTransport` answers requests from a script of URL fragments and
//! records everything it was asked to send.

#![allow(dead_code)]

use async_trait::async_trait;
use geoprobe::plugin::api::{DiscoveryConfig, Registry};
use geoprobe::probe::{
    ProbeRequest, ProbeResponse, ProbeRunner, RunnerOptions, Transport, TransportError,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum Reply {
    Respond(ProbeResponse),
    Fail(TransportError),
    /// Answer after a delay; times out when the request timeout is shorter
    Slow(Duration, ProbeResponse),
}

#[derive(Debug, Default)]
pub struct MockTransport {
    script: Mutex<Vec<(String, Reply)>>,
    seen: Mutex<Vec<ProbeRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply to every URL containing `fragment`; first match wins
    pub fn on(self, fragment: &str, reply: Reply) -> Self {
        self.script
            .lock()
            .unwrap()
            .push((fragment.to_string(), reply));
        self
    }

    pub fn respond(self, fragment: &str, response: ProbeResponse) -> Self {
        self.on(fragment, Reply::Respond(response))
    }

    pub fn requests(&self) -> Vec<ProbeRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ProbeRequest) -> Result<ProbeResponse, TransportError> {
        self.seen.lock().unwrap().push(request.clone());
        let reply = self
            .script
            .lock()
            .unwrap()
            .iter()
            .find(|(fragment, _)| request.url.contains(fragment.as_str()))
            .map(|(_, reply)| reply.clone());

        match reply {
            None => Ok(ProbeResponse::new(404, "not scripted")),
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Fail(err)) => Err(err),
            Some(Reply::Slow(delay, response)) => {
                let limit = request.timeout.unwrap_or(delay);
                if delay > limit {
                    tokio::time::sleep(limit).await;
                    return Err(TransportError::Timeout {
                        url: request.url,
                        seconds: limit.as_secs_f64(),
                    });
                }
                tokio::time::sleep(delay).await;
                Ok(response)
            }
        }
    }
}

pub fn registry() -> Arc<Registry> {
    Arc::new(Registry::discover(&DiscoveryConfig::default()))
}

pub fn runner(transport: Arc<MockTransport>) -> ProbeRunner {
    runner_with(transport, RunnerOptions::default())
}

pub fn runner_with(transport: Arc<MockTransport>, options: RunnerOptions) -> ProbeRunner {
    ProbeRunner::new(registry(), transport, options)
}

pub fn xml(body: &str) -> ProbeResponse {
    ProbeResponse::new(200, body.as_bytes().to_vec()).with_header("content-type", "text/xml")
}

pub const WMS_CAPABILITIES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<WMT_MS_Capabilities version="1.1.1">
  <Service>
    <Name>OGC:WMS</Name>
    <Title>Demo WMS</Title>
  </Service>
  <Capability>
    <Request>
      <GetMap><Format>image/png</Format></GetMap>
    </Request>
    <Layer>
      <Title>Root</Title>
      <SRS>EPSG:4326</SRS>
      <LatLonBoundingBox minx="4" miny="52" maxx="5" maxy="53"/>
      <Layer><Name>roads</Name><Title>Roads</Title></Layer>
      <Layer><Name>rivers</Name><Title>Rivers</Title></Layer>
      <Layer><Name>parcels</Name><Title>Parcels</Title></Layer>
    </Layer>
  </Capability>
</WMT_MS_Capabilities>"#;

pub const OWS_EXCEPTION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ServiceExceptionReport version="1.1.1">
  <ServiceException code="VersionNegotiationFailed">Unsupported version</ServiceException>
</ServiceExceptionReport>"#;
