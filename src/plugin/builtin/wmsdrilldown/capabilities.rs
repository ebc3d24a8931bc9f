//! Minimal WMS Capabilities reader
//!
//! Pulls out only what the drilldown needs: the service title, GetMap
//! output formats and named layers with their CRS list and geographic
//! bounding box. Nested layers inherit both from their parents.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

const ROOT_ELEMENTS: [&str; 2] = ["WMT_MS_Capabilities", "WMS_Capabilities"];

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayerInfo {
    pub name: String,
    pub title: Option<String>,
    pub crs: Vec<String>,
    /// minx, miny, maxx, maxy in WGS84 longitude/latitude
    pub bbox: Option<[f64; 4]>,
}

impl LayerInfo {
    /// A GetMap in EPSG:4326 can be built for this layer
    pub fn is_testable(&self) -> bool {
        self.bbox.is_some() && self.crs.iter().any(|c| c.eq_ignore_ascii_case("EPSG:4326"))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Capabilities {
    pub version: Option<String>,
    pub title: Option<String>,
    pub getmap_formats: Vec<String>,
    pub layers: Vec<LayerInfo>,
}

impl Capabilities {
    /// First advertised image format, or PNG
    pub fn image_format(&self) -> &str {
        self.getmap_formats
            .iter()
            .find(|f| f.starts_with("image/"))
            .map(String::as_str)
            .unwrap_or("image/png")
    }
}

#[derive(Debug, Default)]
struct OpenLayer {
    info: LayerInfo,
    geo_box: [Option<f64>; 4],
}

pub fn parse(body: &[u8]) -> Result<Capabilities, String> {
    let mut reader = Reader::from_reader(body);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut open: Vec<OpenLayer> = Vec::new();
    let mut caps = Capabilities::default();
    let mut exception: Option<String> = None;
    let mut root_seen = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                if path.is_empty() {
                    check_root(&name, root_seen)?;
                    root_seen = true;
                    if name.ends_with("ExceptionReport") {
                        exception = Some(String::new());
                    }
                    caps.version = attribute(&e, "version");
                }
                start_element(&name, &e, &mut open);
                path.push(name);
            }
            Ok(Event::Empty(e)) => {
                let name = local_name(&e);
                if path.is_empty() {
                    check_root(&name, root_seen)?;
                    root_seen = true;
                }
                start_element(&name, &e, &mut open);
                if name == "Layer" {
                    close_layer(&mut open, &mut caps);
                }
            }
            Ok(Event::End(_)) => {
                if path.pop().as_deref() == Some("Layer") {
                    close_layer(&mut open, &mut caps);
                }
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(|e| e.to_string())?.into_owned();
                if let Some(message) = exception.as_mut() {
                    message.push_str(&text);
                } else {
                    element_text(&path, text, &mut open, &mut caps);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(format!("{} (at byte {})", e, reader.buffer_position())),
        }
        buf.clear();
    }

    if let Some(message) = exception {
        return Err(format!("Service exception: {}", message.trim()));
    }
    if !root_seen {
        return Err("not a WMS Capabilities document: no root element".to_string());
    }
    if !path.is_empty() {
        return Err("document ends inside an element".to_string());
    }
    Ok(caps)
}

/// Only one root, and it must be Capabilities or an exception report
fn check_root(name: &str, root_seen: bool) -> Result<(), String> {
    if root_seen {
        return Err(format!("unexpected second root element <{}>", name));
    }
    if ROOT_ELEMENTS.contains(&name) || name.ends_with("ExceptionReport") {
        Ok(())
    } else {
        Err(format!("not a WMS Capabilities document: {}", name))
    }
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart<'_>, wanted: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == wanted.as_bytes())
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

fn start_element(name: &str, e: &BytesStart<'_>, open: &mut Vec<OpenLayer>) {
    match name {
        "Layer" => {
            // Inherited from the enclosing layer
            let mut layer = OpenLayer::default();
            if let Some(parent) = open.last() {
                layer.info.crs = parent.info.crs.clone();
                layer.info.bbox = parent.info.bbox;
            }
            open.push(layer);
        }
        "LatLonBoundingBox" => {
            if let Some(layer) = open.last_mut() {
                let coords: Vec<f64> = ["minx", "miny", "maxx", "maxy"]
                    .iter()
                    .filter_map(|k| attribute(e, k).and_then(|v| v.trim().parse().ok()))
                    .collect();
                if let [minx, miny, maxx, maxy] = coords[..] {
                    layer.info.bbox = Some([minx, miny, maxx, maxy]);
                }
            }
        }
        _ => {}
    }
}

fn element_text(path: &[String], text: String, open: &mut [OpenLayer], caps: &mut Capabilities) {
    let (element, parent) = match path {
        [.., parent, element] => (element.as_str(), parent.as_str()),
        _ => return,
    };

    match (parent, element) {
        ("Service", "Title") => caps.title = Some(text),
        ("GetMap", "Format") => caps.getmap_formats.push(text),
        ("Layer", "Name") => {
            if let Some(layer) = open.last_mut() {
                layer.info.name = text;
            }
        }
        ("Layer", "Title") => {
            if let Some(layer) = open.last_mut() {
                layer.info.title = Some(text);
            }
        }
        ("Layer", "SRS") | ("Layer", "CRS") => {
            if let Some(layer) = open.last_mut() {
                for crs in text.split_whitespace() {
                    if !layer.info.crs.iter().any(|c| c == crs) {
                        layer.info.crs.push(crs.to_string());
                    }
                }
            }
        }
        ("EX_GeographicBoundingBox", bound) => {
            let index = match bound {
                "westBoundLongitude" => 0,
                "southBoundLatitude" => 1,
                "eastBoundLongitude" => 2,
                "northBoundLatitude" => 3,
                _ => return,
            };
            if let Some(layer) = open.last_mut() {
                layer.geo_box[index] = text.trim().parse().ok();
                if let [Some(w), Some(s), Some(e), Some(n)] = layer.geo_box {
                    layer.info.bbox = Some([w, s, e, n]);
                }
            }
        }
        _ => {}
    }
}

fn close_layer(open: &mut Vec<OpenLayer>, caps: &mut Capabilities) {
    if let Some(layer) = open.pop() {
        if !layer.info.name.is_empty() {
            caps.layers.push(layer.info);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WMS_111: &str = r#"<?xml version="1.0"?>
<WMT_MS_Capabilities version="1.1.1">
  <Service><Name>OGC:WMS</Name><Title>Demo &amp; Test</Title></Service>
  <Capability>
    <Request>
      <GetMap><Format>text/xml</Format><Format>image/png</Format></GetMap>
    </Request>
    <Layer>
      <Title>Root</Title>
      <SRS>EPSG:4326 EPSG:3857</SRS>
      <LatLonBoundingBox minx="-10" miny="40" maxx="10" maxy="60"/>
      <Layer><Name>roads</Name><Title>Roads</Title></Layer>
      <Layer>
        <Name>rivers</Name>
        <LatLonBoundingBox minx="0" miny="50" maxx="5" maxy="55"/>
      </Layer>
    </Layer>
  </Capability>
</WMT_MS_Capabilities>"#;

    const WMS_130: &str = r#"<?xml version="1.0"?>
<WMS_Capabilities version="1.3.0" xmlns="http://www.opengis.net/wms">
  <Service><Title>Demo 1.3</Title></Service>
  <Capability>
    <Request><GetMap><Format>image/jpeg</Format></GetMap></Request>
    <Layer>
      <CRS>CRS:84</CRS>
      <Layer>
        <Name>parcels</Name>
        <CRS>EPSG:4326</CRS>
        <EX_GeographicBoundingBox>
          <westBoundLongitude>4.1</westBoundLongitude>
          <eastBoundLongitude>4.9</eastBoundLongitude>
          <southBoundLatitude>52.0</southBoundLatitude>
          <northBoundLatitude>52.5</northBoundLatitude>
        </EX_GeographicBoundingBox>
      </Layer>
    </Layer>
  </Capability>
</WMS_Capabilities>"#;

    #[test]
    fn test_parse_111_with_inheritance() {
        let caps = parse(WMS_111.as_bytes()).unwrap();
        assert_eq!(caps.version.as_deref(), Some("1.1.1"));
        assert_eq!(caps.title.as_deref(), Some("Demo & Test"));
        assert_eq!(caps.image_format(), "image/png");
        assert_eq!(caps.layers.len(), 2);

        let roads = &caps.layers[0];
        assert_eq!(roads.name, "roads");
        assert_eq!(roads.bbox, Some([-10.0, 40.0, 10.0, 60.0]));
        assert!(roads.is_testable());

        let rivers = &caps.layers[1];
        assert_eq!(rivers.bbox, Some([0.0, 50.0, 5.0, 55.0]));
        assert_eq!(rivers.crs, vec!["EPSG:4326", "EPSG:3857"]);
    }

    #[test]
    fn test_parse_130_geographic_box() {
        let caps = parse(WMS_130.as_bytes()).unwrap();
        assert_eq!(caps.version.as_deref(), Some("1.3.0"));
        assert_eq!(caps.layers.len(), 1);
        assert_eq!(caps.layers[0].bbox, Some([4.1, 52.0, 4.9, 52.5]));
        assert_eq!(caps.layers[0].crs, vec!["CRS:84", "EPSG:4326"]);
        assert_eq!(caps.image_format(), "image/jpeg");
    }

    #[test]
    fn test_exception_report_is_an_error() {
        let body = r#"<ServiceExceptionReport version="1.1.1">
            <ServiceException code="InvalidFormat">Unknown format</ServiceException>
        </ServiceExceptionReport>"#;
        let err = parse(body.as_bytes()).unwrap_err();
        assert!(err.contains("Unknown format"));
    }

    #[test]
    fn test_other_documents_are_rejected() {
        let html = parse(b"<html><body>Login page</body></html>").unwrap_err();
        assert_eq!(html, "not a WMS Capabilities document: html");

        let feed = parse(b"<?xml version=\"1.0\"?><rss version=\"2.0\"/>").unwrap_err();
        assert_eq!(feed, "not a WMS Capabilities document: rss");

        let wfs = parse(b"<wfs:WFS_Capabilities xmlns:wfs=\"http://www.opengis.net/wfs\"></wfs:WFS_Capabilities>");
        assert_eq!(wfs.unwrap_err(), "not a WMS Capabilities document: WFS_Capabilities");
    }

    #[test]
    fn test_rootless_input_is_rejected() {
        let expected = "not a WMS Capabilities document: no root element";
        assert_eq!(parse(b"Service temporarily down").unwrap_err(), expected);
        assert_eq!(parse(b"").unwrap_err(), expected);
        assert_eq!(parse(b"<?xml version=\"1.0\"?>").unwrap_err(), expected);
    }

    #[test]
    fn test_empty_root_is_accepted() {
        let caps = parse(b"<WMS_Capabilities version=\"1.3.0\"/>").unwrap();
        assert!(caps.layers.is_empty());
    }

    #[test]
    fn test_malformed_is_an_error() {
        assert!(parse(b"<WMT_MS_Capabilities><Service></WMT_MS_Capabilities>").is_err());
    }
}
