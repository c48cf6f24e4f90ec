use log::{debug, warn};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::Error;
use crate::gpx_types::*;

type Result<T> = std::result::Result<T, Error>;

/// Parse a GPX XML string into a GpxDocument.
///
/// `<trkpt>` and `<rtept>` elements are collected wherever they appear, so
/// multiple tracks and segments end up in one sequence in document order.
pub fn parse_gpx(xml: &str) -> Result<GpxDocument> {
    let mut reader = Reader::from_str(xml);
    let mut doc = GpxDocument::default();
    let mut route_name = None;
    let mut route_desc = None;
    // local names of the currently open elements, excluding points and text leaves
    let mut open: Vec<Vec<u8>> = Vec::new();
    let mut seen_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if !seen_root {
                    doc.namespace = read_root(&e)?;
                    seen_root = true;
                }
                let parent = open.last().cloned().unwrap_or_default();
                match (e.local_name().as_ref(), parent.as_slice()) {
                    (b"trkpt", _) => doc.track_points.push(parse_point(&e, &mut reader, "trkpt")?),
                    (b"rtept", _) => doc.route_points.push(parse_point(&e, &mut reader, "rtept")?),
                    (b"name", b"trk") => keep_first(&mut doc.name, read_text_owned(&mut reader, &e)?),
                    (b"desc", b"trk") => keep_first(&mut doc.desc, read_text_owned(&mut reader, &e)?),
                    (b"name", b"rte") => keep_first(&mut route_name, read_text_owned(&mut reader, &e)?),
                    (b"desc", b"rte") => keep_first(&mut route_desc, read_text_owned(&mut reader, &e)?),
                    (name, _) => open.push(name.to_vec()),
                }
            }
            Ok(Event::Empty(e)) => {
                if !seen_root {
                    doc.namespace = read_root(&e)?;
                    seen_root = true;
                }
                match e.local_name().as_ref() {
                    b"trkpt" => {
                        let (lat, lon) = parse_lat_lon(&e, "trkpt")?;
                        doc.track_points.push(RawPoint::new(lat, lon));
                    }
                    b"rtept" => {
                        let (lat, lon) = parse_lat_lon(&e, "rtept")?;
                        doc.route_points.push(RawPoint::new(lat, lon));
                    }
                    _ => {}
                }
            }
            Ok(Event::End(_)) => {
                open.pop();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::XmlParse(e)),
            _ => {}
        }
    }

    if !seen_root {
        return Err(Error::InvalidDocument("no root element".to_string()));
    }
    if let Some(name) = open.last() {
        return Err(Error::InvalidDocument(format!(
            "document ends inside <{}>",
            String::from_utf8_lossy(name)
        )));
    }

    if doc.name.is_none() && doc.desc.is_none() {
        doc.name = route_name;
        doc.desc = route_desc;
    }
    debug!(
        "parsed {} <trkpt> and {} <rtept> elements",
        doc.track_points.len(),
        doc.route_points.len()
    );
    Ok(doc)
}

fn keep_first(slot: &mut Option<String>, value: String) {
    if slot.is_none() {
        *slot = Some(value);
    }
}

/// Check the root is `<gpx>` and return its default namespace, if declared.
fn read_root(e: &BytesStart<'_>) -> Result<Option<String>> {
    if e.local_name().as_ref() != b"gpx" {
        return Err(Error::InvalidDocument(format!(
            "root element is <{}>, expected <gpx>",
            String::from_utf8_lossy(e.name().as_ref())
        )));
    }
    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|e| Error::XmlParse(e.into()))?;
        if attr.key.as_ref() == b"xmlns" {
            let uri = std::str::from_utf8(&attr.value).unwrap_or_default();
            return Ok(Some(uri.to_string()));
        }
    }
    debug!("no namespace declared on <gpx>");
    Ok(None)
}

/// Parse lat/lon attributes from a point element's start tag.
fn parse_lat_lon(e: &BytesStart<'_>, element: &'static str) -> Result<(f64, f64)> {
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;

    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|e| Error::XmlParse(e.into()))?;
        let key = attr.key.local_name();
        let val = std::str::from_utf8(&attr.value).unwrap_or_default();
        let invalid = |attribute| Error::InvalidAttribute {
            element,
            attribute,
            value: val.to_string(),
        };
        match key.as_ref() {
            b"lat" => lat = Some(val.trim().parse::<f64>().map_err(|_| invalid("lat"))?),
            b"lon" => lon = Some(val.trim().parse::<f64>().map_err(|_| invalid("lon"))?),
            _ => {}
        }
    }

    let lat = lat.ok_or(Error::MissingAttribute {
        element,
        attribute: "lat",
    })?;
    let lon = lon.ok_or(Error::MissingAttribute {
        element,
        attribute: "lon",
    })?;

    Ok((lat, lon))
}

/// Parse a point element and its `<ele>`/`<time>` children.
/// Called after receiving Event::Start for the point element.
fn parse_point<'a>(
    start: &BytesStart<'a>,
    reader: &mut Reader<&'a [u8]>,
    element: &'static str,
) -> Result<RawPoint> {
    let (lat, lon) = parse_lat_lon(start, element)?;
    let mut point = RawPoint::new(lat, lon);
    let end_name = start.name().0.to_vec();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"ele" => {
                    let text = read_text_owned(reader, &e)?;
                    point.ele = match text.trim().parse::<f64>() {
                        Ok(ele) => Some(ele),
                        Err(_) => {
                            warn!("<{element}> at ({lat}, {lon}) has unusable <ele> '{text}', treated as missing");
                            None
                        }
                    };
                }
                b"time" => {
                    let text = read_text_owned(reader, &e)?;
                    let text = text.trim();
                    point.time = (!text.is_empty()).then(|| text.to_string());
                }
                _ => {
                    // extensions, names and anything else a device adds
                    reader.read_to_end(e.name()).map_err(Error::XmlParse)?;
                }
            },
            Ok(Event::End(e)) if e.name().0 == end_name.as_slice() => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::XmlParse(e)),
            _ => {}
        }
    }

    Ok(point)
}

/// Read text content of an element as an owned String.
/// Handles regular text, CDATA sections, and entity references (Event::GeneralRef).
fn read_text_owned<'a>(reader: &mut Reader<&'a [u8]>, start: &BytesStart<'_>) -> Result<String> {
    let end_name = start.name().0.to_vec();
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Text(e)) => {
                text.push_str(std::str::from_utf8(e.as_ref()).unwrap_or_default());
            }
            Ok(Event::CData(e)) => {
                text.push_str(std::str::from_utf8(e.as_ref()).unwrap_or_default());
            }
            Ok(Event::GeneralRef(e)) => {
                if let Ok(Some(ch)) = e.resolve_char_ref() {
                    text.push(ch);
                } else {
                    match std::str::from_utf8(e.as_ref()).unwrap_or_default() {
                        "amp" => text.push('&'),
                        "lt" => text.push('<'),
                        "gt" => text.push('>'),
                        "quot" => text.push('"'),
                        "apos" => text.push('\''),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) if e.name().0 == end_name.as_slice() => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::XmlParse(e)),
            _ => {}
        }
    }

    Ok(text)
}
