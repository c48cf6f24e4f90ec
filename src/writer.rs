use log::debug;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::Error;
use crate::options::XmlOptions;
use crate::tabular;
use crate::track::TrackProcessor;

pub const CREATOR: &str = "gpx-osgrid";

type Result<T> = std::result::Result<T, Error>;

/// Build a minimal GPX document from the tabular records of a processed track.
pub(crate) fn render(processor: &TrackProcessor, xml_options: &XmlOptions) -> Result<String> {
    let options = processor.options();
    let records = tabular::records(processor, options.precision, options.distance_tolerance)?;
    let track = xml_options.track;
    let (container, vertex) = if track { ("trk", "trkpt") } else { ("rte", "rtept") };
    debug!("writing <{container}> document with {} <{vertex}> elements", records.len());

    let mut w = if xml_options.pretty {
        Writer::new_with_indent(Vec::new(), b' ', 2)
    } else {
        Writer::new(Vec::new())
    };

    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut gpx = BytesStart::new("gpx");
    if let Some(uri) = xml_options.namespace.uri() {
        gpx.push_attribute(("xmlns", uri));
    }
    gpx.push_attribute(("version", "1.0"));
    gpx.push_attribute(("creator", CREATOR));
    w.write_event(Event::Start(gpx))?;
    w.write_event(Event::Start(BytesStart::new(container)))?;

    if let Some(name) = processor.name() {
        write_text_element(&mut w, "name", name)?;
    }
    if let Some(desc) = processor.desc() {
        write_text_element(&mut w, "desc", desc)?;
    }
    if track {
        w.write_event(Event::Start(BytesStart::new("trkseg")))?;
    }

    for record in &records {
        let mut point = BytesStart::new(vertex);
        point.push_attribute(("lat", record.latitude.as_str()));
        point.push_attribute(("lon", record.longitude.as_str()));
        w.write_event(Event::Start(point))?;
        write_text_element(&mut w, "ele", &record.elevation)?;
        if track && options.process_time {
            if let Some(ts) = record.timestamp.as_deref().filter(|ts| !ts.is_empty()) {
                write_text_element(&mut w, "time", ts)?;
            }
        }
        w.write_event(Event::End(BytesEnd::new(vertex)))?;
    }

    if track {
        w.write_event(Event::End(BytesEnd::new("trkseg")))?;
    }
    w.write_event(Event::End(BytesEnd::new(container)))?;
    w.write_event(Event::End(BytesEnd::new("gpx")))?;

    let mut xml = String::from_utf8_lossy(&w.into_inner()).into_owned();
    xml.push('\n');
    Ok(xml)
}

fn write_text_element(w: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::Text(BytesText::new(text)))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
